//! Binary logistic regression.

const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-10;

/// L2-regularized logistic regression with an unpenalized intercept.
///
/// Minimizes `|w|^2 / 2 + c * sum(log_loss)` with Newton's method, which converges in a few iterations for the small
/// number of features used here.
#[derive(Clone, Debug, PartialEq)]
pub struct LogisticRegression<const N: usize> {
    weights: [f64; N],
    intercept: f64,
}

impl<const N: usize> LogisticRegression<N> {
    /// Creates a model with the given coefficients.
    pub fn new(weights: [f64; N], intercept: f64) -> Self {
        Self { weights, intercept }
    }

    /// Fits the model to samples `x` with binary targets `y` and inverse regularization strength `c`.
    pub fn fit(x: &[[f64; N]], y: &[bool], c: f64) -> Self {
        assert_eq!(x.len(), y.len(), "samples and targets differ in length");
        let mut model = Self::new([0.; N], 0.);
        for _ in 0..MAX_ITERATIONS {
            // unknowns: N weights followed by the intercept
            let mut gradient = vec![0.; N + 1];
            let mut hessian = vec![vec![0.; N + 1]; N + 1];
            for i in 0..N {
                gradient[i] = model.weights[i];
                hessian[i][i] = 1.;
            }
            hessian[N][N] = 1e-12;
            for (sample, &target) in x.iter().zip(y) {
                let p = model.probability(sample);
                let residual = p - if target { 1. } else { 0. };
                let curvature = p * (1. - p);
                for i in 0..=N {
                    let xi = if i < N { sample[i] } else { 1. };
                    gradient[i] += c * residual * xi;
                    for j in 0..=N {
                        let xj = if j < N { sample[j] } else { 1. };
                        hessian[i][j] += c * curvature * xi * xj;
                    }
                }
            }
            let step = match solve(hessian, gradient) {
                Some(step) => step,
                None => break,
            };
            for i in 0..N {
                model.weights[i] -= step[i];
            }
            model.intercept -= step[N];
            if step.iter().map(|s| s * s).sum::<f64>().sqrt() < TOLERANCE {
                break;
            }
        }
        model
    }

    pub fn weights(&self) -> &[f64; N] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Probability of the positive class.
    pub fn probability(&self, sample: &[f64; N]) -> f64 {
        let z: f64 = self.intercept + self.weights.iter().zip(sample).map(|(w, x)| w * x).sum::<f64>();
        1. / (1. + (-z).exp())
    }

    /// Predicts the positive class when its probability exceeds one half.
    pub fn predict(&self, sample: &[f64; N]) -> bool {
        self.probability(sample) > 0.5
    }
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0. {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
