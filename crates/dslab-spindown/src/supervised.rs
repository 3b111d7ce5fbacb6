//! Supervised shutdown predictor.
//!
//! A logistic regression model is fitted offline on a training workload to predict whether an idle interval will
//! be at least as long as the break-even threshold. With `lookback` σ the features are:
//! - the fraction of the last σ idle intervals reaching the break-even threshold,
//! - the z-score of the most recent busy interval length among the last 2σ busy intervals,
//! - the z-score of the most recent idle interval length among the last 2σ idle intervals.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::device::DeviceProfile;
use crate::error::SimError;
use crate::logistic::LogisticRegression;
use crate::policy::{option, IdleSlot, SpinDownPolicy};
use crate::state::PowerStateMachine;
use crate::trace::{Interval, Workload};

/// Inverse regularization strength of the fitted model.
const REGULARIZATION: f64 = 1.;

/// Sliding windows of recent interval lengths the predictor features are computed from.
///
/// Each window keeps up to `2 * lookback` values. Features are available once both hold at least `lookback`.
#[derive(Clone, Debug)]
pub struct FeatureWindow {
    lookback: usize,
    threshold: f64,
    idle: VecDeque<u64>,
    busy: VecDeque<u64>,
}

impl FeatureWindow {
    pub fn new(lookback: usize, threshold: f64) -> Self {
        assert!(lookback > 0, "lookback must be positive");
        Self {
            lookback,
            threshold,
            idle: VecDeque::with_capacity(2 * lookback + 1),
            busy: VecDeque::with_capacity(2 * lookback + 1),
        }
    }

    pub fn push_idle(&mut self, length: u64) {
        push_bounded(&mut self.idle, length, 2 * self.lookback);
    }

    pub fn push_busy(&mut self, length: u64) {
        push_bounded(&mut self.busy, length, 2 * self.lookback);
    }

    /// Returns the features once both windows hold at least `lookback` values.
    pub fn features(&self) -> Option<[f64; 3]> {
        if self.idle.len() < self.lookback || self.busy.len() < self.lookback {
            return None;
        }
        let long = self
            .idle
            .iter()
            .rev()
            .take(self.lookback)
            .filter(|&&x| x as f64 >= self.threshold)
            .count();
        Some([
            long as f64 / self.lookback as f64,
            z_score(&self.busy),
            z_score(&self.idle),
        ])
    }
}

fn push_bounded(window: &mut VecDeque<u64>, value: u64, capacity: usize) {
    window.push_back(value);
    if window.len() > capacity {
        window.pop_front();
    }
}

/// Z-score of the last value relative to the whole window, zero for a window without variance.
fn z_score(window: &VecDeque<u64>) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance = window.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    match window.back() {
        Some(&last) if std > 0. => (last as f64 - mean) / std,
        _ => 0.,
    }
}

/// Decision rule produced by training.
#[derive(Clone, Debug, PartialEq)]
pub enum Predictor {
    /// Training data had a single class (or no samples at all).
    Constant(bool),
    Model(LogisticRegression<3>),
}

#[derive(Clone)]
pub struct SupervisedPolicy {
    lookback: usize,
    predictor: Predictor,
    window: FeatureWindow,
}

impl SupervisedPolicy {
    /// Fits the predictor on the `training` workload.
    pub fn train(lookback: usize, threshold: f64, training: &Workload) -> Self {
        let mut window = FeatureWindow::new(lookback, threshold);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for interval in training.iter() {
            match interval {
                Interval::Idle(len) => {
                    if let Some(features) = window.features() {
                        x.push(features);
                        y.push(len as f64 >= threshold);
                    }
                    window.push_idle(len);
                }
                Interval::Busy(len) => window.push_busy(len),
            }
        }
        let positive = y.iter().filter(|&&t| t).count();
        let predictor = if positive == 0 {
            Predictor::Constant(false)
        } else if positive == y.len() {
            Predictor::Constant(true)
        } else {
            Predictor::Model(LogisticRegression::fit(&x, &y, REGULARIZATION))
        };
        debug!(
            "supervised predictor trained on {} samples ({} positive): {:?}",
            y.len(),
            positive,
            predictor
        );
        Self::with_predictor(lookback, threshold, predictor)
    }

    /// Creates the policy with an already trained predictor.
    pub fn with_predictor(lookback: usize, threshold: f64, predictor: Predictor) -> Self {
        Self {
            lookback,
            predictor,
            window: FeatureWindow::new(lookback, threshold),
        }
    }

    pub fn from_options_map(
        options: &HashMap<String, String>,
        device: &DeviceProfile,
        training: &Workload,
    ) -> Result<Self, SimError> {
        let lookback = option(options, "lookback", 10usize)?;
        if lookback == 0 {
            return Err(SimError::config("supervised lookback must be positive"));
        }
        Ok(Self::train(lookback, device.break_even_threshold(), training))
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    fn should_shutdown(&self) -> bool {
        match &self.predictor {
            Predictor::Constant(decision) => *decision,
            Predictor::Model(model) => self.window.features().map_or(false, |f| model.predict(&f)),
        }
    }
}

impl SpinDownPolicy for SupervisedPolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        if self.should_shutdown() {
            machine.shutdown(idle.remaining)
        } else {
            machine.standby(idle.remaining)
        }
    }

    fn observe_busy(&mut self, length: u64) {
        self.window.push_busy(length);
    }

    fn observe_idle(&mut self, length: u64) {
        self.window.push_idle(length);
    }

    fn to_string(&self) -> String {
        format!("Supervised[lookback={}]", self.lookback)
    }
}
