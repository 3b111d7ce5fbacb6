//! Adaptive moving-average predictor.

use std::collections::HashMap;

use crate::device::DeviceProfile;
use crate::error::SimError;
use crate::policy::{option, required_option, IdleSlot, SpinDownPolicy};
use crate::state::PowerStateMachine;

/// Predicts the length of the next idle interval with an exponential moving average of the previous ones and shuts
/// the device down when the prediction reaches the break-even threshold.
///
/// The average uses smoothing factor `2 / (1 + lookback)` and is initialized with the arithmetic mean of the first
/// `lookback` idle intervals. No shutdowns happen during this warm-up. With `adjust` set, the time already spent
/// serving the backlog is subtracted from the prediction.
#[derive(Clone)]
pub struct MovingAveragePolicy {
    lookback: usize,
    smoothing: f64,
    threshold: f64,
    adjust: bool,
    observed: usize,
    warmup_sum: f64,
    average: f64,
}

impl MovingAveragePolicy {
    pub fn new(lookback: usize, threshold: f64, adjust: bool) -> Self {
        assert!(lookback > 0, "lookback must be positive");
        Self {
            lookback,
            smoothing: 2. / (1. + lookback as f64),
            threshold,
            adjust,
            observed: 0,
            warmup_sum: 0.,
            average: 0.,
        }
    }

    pub fn from_options_map(options: &HashMap<String, String>, device: &DeviceProfile) -> Result<Self, SimError> {
        let lookback: usize = required_option(options, "lookback")?;
        if lookback == 0 {
            return Err(SimError::config("moving average lookback must be positive"));
        }
        let adjust = option(options, "adjust", true)?;
        Ok(Self::new(lookback, device.break_even_threshold(), adjust))
    }

    /// Current prediction of the idle interval length, available after the warm-up.
    pub fn average(&self) -> Option<f64> {
        if self.observed >= self.lookback {
            Some(self.average)
        } else {
            None
        }
    }
}

impl SpinDownPolicy for MovingAveragePolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        let mut prediction = match self.average() {
            Some(avg) => avg,
            None => return machine.standby(idle.remaining),
        };
        if self.adjust {
            prediction -= idle.spent() as f64;
        }
        if prediction >= self.threshold {
            machine.shutdown(idle.remaining)
        } else {
            machine.standby(idle.remaining)
        }
    }

    fn observe_idle(&mut self, length: u64) {
        let length = length as f64;
        if self.observed < self.lookback {
            self.warmup_sum += length;
            self.observed += 1;
            if self.observed == self.lookback {
                self.average = self.warmup_sum / self.lookback as f64;
            }
        } else {
            self.average = self.average * (1. - self.smoothing) + length * self.smoothing;
        }
    }

    fn to_string(&self) -> String {
        format!("MovingAverage[lookback={},adjust={}]", self.lookback, self.adjust)
    }
}
