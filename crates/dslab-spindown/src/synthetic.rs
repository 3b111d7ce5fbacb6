//! Synthetic workload generator.

use rand::prelude::*;
use rand_distr::Exp;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::trace::Workload;

/// Synthetic workload generation settings.
///
/// Idle interval lengths follow a mixture of two exponential distributions (short gaps between bursts and long
/// pauses), busy interval lengths follow an exponential distribution. All lengths are rounded up to whole ms.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticWorkloadConfig {
    /// Number of idle/busy pairs.
    pub intervals: usize,
    /// Mean length of a short idle interval, ms.
    pub mean_idle: f64,
    /// Mean length of a long idle interval, ms.
    pub long_idle_mean: f64,
    /// Probability that an idle interval is drawn from the long distribution.
    pub long_idle_prob: f64,
    /// Mean length of a busy interval, ms.
    pub mean_busy: f64,
    /// Random generator seed.
    pub seed: u64,
}

impl Default for SyntheticWorkloadConfig {
    fn default() -> Self {
        Self {
            intervals: 1000,
            mean_idle: 2000.,
            long_idle_mean: 60000.,
            long_idle_prob: 0.2,
            mean_busy: 500.,
            seed: 123,
        }
    }
}

fn exp(mean: f64, name: &str) -> Result<Exp<f64>, SimError> {
    if !(mean.is_finite() && mean > 0.) {
        return Err(SimError::config(format!("{} must be positive, got {}", name, mean)));
    }
    Exp::new(1. / mean).map_err(|e| SimError::config(format!("{}: {}", name, e)))
}

/// Generates a trace starting with an idle interval and alternating idle and busy intervals.
pub fn generate_synthetic_workload(config: &SyntheticWorkloadConfig) -> Result<Workload, SimError> {
    if !(0. ..=1.).contains(&config.long_idle_prob) {
        return Err(SimError::config(format!(
            "long_idle_prob must be in [0, 1], got {}",
            config.long_idle_prob
        )));
    }
    let short_idle = exp(config.mean_idle, "mean_idle")?;
    let long_idle = exp(config.long_idle_mean, "long_idle_mean")?;
    let busy = exp(config.mean_busy, "mean_busy")?;
    let mut gen = Pcg64::seed_from_u64(config.seed);
    let mut intervals = Vec::with_capacity(config.intervals * 2);
    for _ in 0..config.intervals {
        let idle = if gen.gen::<f64>() < config.long_idle_prob {
            long_idle.sample(&mut gen)
        } else {
            short_idle.sample(&mut gen)
        };
        intervals.push(-(idle.ceil().max(1.) as i64));
        intervals.push(busy.sample(&mut gen).ceil().max(1.) as i64);
    }
    Ok(Workload::new(intervals))
}
