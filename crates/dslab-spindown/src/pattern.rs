//! Bounded-history pattern predictor.
//!
//! Each idle interval is classified as long (at least the break-even threshold) or short. The last `history`
//! outcomes form a bit pattern, and for each pattern the policy counts how often the next idle interval was long.
//! When the current pattern has been seen before, the device is shut down if a long interval is more likely than a
//! short one. The stochastic variant shuts down with the estimated probability instead.

use std::collections::HashMap;

use rand::prelude::*;
use rand_pcg::Pcg64;
use rustc_hash::FxHashMap;

use crate::device::DeviceProfile;
use crate::error::SimError;
use crate::policy::{option, IdleSlot, SpinDownPolicy};
use crate::state::PowerStateMachine;

const MAX_HISTORY: usize = 32;

/// Outcome counts observed after a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternCounts {
    pub short: u64,
    pub long: u64,
}

impl PatternCounts {
    /// Empirical probability of a long interval, if the pattern has outcomes.
    pub fn long_probability(&self) -> Option<f64> {
        let total = self.short + self.long;
        if total == 0 {
            None
        } else {
            Some(self.long as f64 / total as f64)
        }
    }
}

#[derive(Clone)]
pub struct PatternPolicy {
    history_len: usize,
    threshold: f64,
    stochastic: bool,
    seed: u64,
    rng: Pcg64,
    pattern: u64,
    observed: usize,
    table: FxHashMap<u64, PatternCounts>,
}

impl PatternPolicy {
    /// Creates the deterministic predictor with patterns of `history_len` outcomes.
    pub fn new(history_len: usize, threshold: f64) -> Self {
        Self::with_sampling(history_len, threshold, false, 0)
    }

    /// Creates the predictor; with `stochastic` set, shutdowns are sampled using a generator seeded with `seed`.
    pub fn with_sampling(history_len: usize, threshold: f64, stochastic: bool, seed: u64) -> Self {
        assert!(
            (1..=MAX_HISTORY).contains(&history_len),
            "history length must be in 1..={}",
            MAX_HISTORY
        );
        Self {
            history_len,
            threshold,
            stochastic,
            seed,
            rng: Pcg64::seed_from_u64(seed),
            pattern: 0,
            observed: 0,
            table: FxHashMap::default(),
        }
    }

    pub fn from_options_map(options: &HashMap<String, String>, device: &DeviceProfile) -> Result<Self, SimError> {
        let history_len = option(options, "history", 4usize)?;
        if !(1..=MAX_HISTORY).contains(&history_len) {
            return Err(SimError::config(format!(
                "pattern history must be in 1..={}, got {}",
                MAX_HISTORY, history_len
            )));
        }
        let stochastic = option(options, "stochastic", false)?;
        let seed = option(options, "seed", 123u64)?;
        Ok(Self::with_sampling(
            history_len,
            device.break_even_threshold(),
            stochastic,
            seed,
        ))
    }

    /// Returns the outcome counts collected for a pattern (most recent outcome in the lowest bit).
    pub fn counts(&self, pattern: u64) -> Option<PatternCounts> {
        self.table.get(&pattern).copied()
    }

    /// Current pattern, available once enough outcomes are observed.
    pub fn current_pattern(&self) -> Option<u64> {
        if self.observed >= self.history_len {
            Some(self.pattern)
        } else {
            None
        }
    }

    fn should_shutdown(&mut self, pattern: u64) -> bool {
        let p = match self.table.get(&pattern).and_then(|c| c.long_probability()) {
            Some(p) => p,
            None => return false,
        };
        if self.stochastic {
            self.rng.gen::<f64>() < p
        } else {
            p > 0.5
        }
    }

    fn record(&mut self, long: bool) {
        if let Some(pattern) = self.current_pattern() {
            let counts = self.table.entry(pattern).or_default();
            if long {
                counts.long += 1;
            } else {
                counts.short += 1;
            }
        }
        let mask = (1u64 << self.history_len) - 1;
        self.pattern = ((self.pattern << 1) | long as u64) & mask;
        self.observed = usize::min(self.observed + 1, self.history_len);
    }
}

impl SpinDownPolicy for PatternPolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        let shutdown = match self.current_pattern() {
            Some(pattern) => self.should_shutdown(pattern),
            None => false,
        };
        self.record(idle.remaining as f64 >= self.threshold);
        if shutdown {
            machine.shutdown(idle.remaining)
        } else {
            machine.standby(idle.remaining)
        }
    }

    fn to_string(&self) -> String {
        format!(
            "PatternPredictor[history={},stochastic={},seed={}]",
            self.history_len, self.stochastic, self.seed
        )
    }
}
