//! Simulation statistics.

use serde::Serialize;

use crate::state::Consumption;
use crate::trace::Interval;

/// Totals accumulated over a simulated workload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimulationStats {
    /// Consumed energy, J.
    pub energy: f64,
    /// Cumulative wait of all requests, ms.
    pub total_wait: f64,
    /// Number of served requests.
    pub requests: u64,
    /// Total length of idle intervals, ms.
    pub idle_time: u64,
    /// Total length of busy intervals, ms.
    pub busy_time: u64,
    /// Number of initiated shutdowns.
    pub shutdowns: u64,
    /// Number of initiated wake-ups.
    pub wakeups: u64,
}

impl SimulationStats {
    pub fn update(&mut self, interval: Interval, consumption: &Consumption) {
        self.energy += consumption.energy;
        self.total_wait += consumption.wait;
        match interval {
            Interval::Idle(len) => self.idle_time += len,
            Interval::Busy(len) => {
                self.busy_time += len;
                self.requests += len;
            }
        }
    }

    /// Average wait per request in ms, undefined for a workload without requests.
    pub fn average_wait(&self) -> Option<f64> {
        if self.requests == 0 {
            None
        } else {
            Some(self.total_wait / self.requests as f64)
        }
    }

    /// Average wait per request in seconds.
    pub fn average_wait_seconds(&self) -> Option<f64> {
        self.average_wait().map(|w| w / 1000.)
    }

    /// Consumed energy in Wh.
    pub fn energy_wh(&self) -> f64 {
        self.energy / 3600.
    }
}
