//! Simulation driver.

use std::sync::Arc;

use log::debug;

use crate::device::DeviceProfile;
use crate::policy::SpinDownPolicy;
use crate::state::{Consumption, PowerStateMachine};
use crate::stats::SimulationStats;
use crate::trace::{Interval, Workload};

/// Simulation of a single device managed by a single policy.
pub struct PolicySimulation {
    machine: PowerStateMachine,
    policy: Box<dyn SpinDownPolicy>,
    stats: SimulationStats,
}

impl PolicySimulation {
    pub fn new(device: Arc<DeviceProfile>, policy: Box<dyn SpinDownPolicy>) -> Self {
        Self {
            machine: PowerStateMachine::new(device),
            policy,
            stats: SimulationStats::default(),
        }
    }

    /// Processes one signed interval of a trace. Zero-length intervals are ignored.
    pub fn process(&mut self, interval: i64) -> Consumption {
        match Interval::from_signed(interval) {
            Some(interval) => self.process_interval(interval),
            None => Consumption::default(),
        }
    }

    pub fn process_interval(&mut self, interval: Interval) -> Consumption {
        let consumption = match interval {
            Interval::Idle(len) => {
                let consumption = self.machine.process_idle(len, self.policy.as_mut());
                self.policy.observe_idle(len);
                consumption
            }
            Interval::Busy(len) => {
                let consumption = self.machine.process_busy(len);
                self.policy.observe_busy(len);
                consumption
            }
        };
        self.stats.update(interval, &consumption);
        self.stats.shutdowns = self.machine.shutdowns();
        self.stats.wakeups = self.machine.wakeups();
        consumption
    }

    /// Processes the whole workload and returns the accumulated statistics.
    pub fn run(&mut self, workload: &Workload) -> SimulationStats {
        for interval in workload.iter() {
            self.process_interval(interval);
        }
        debug!(
            "{} on {}: energy = {:.3} J, requests = {}, shutdowns = {}",
            self.policy.to_string(),
            self.machine.device().name(),
            self.stats.energy,
            self.stats.requests,
            self.stats.shutdowns
        );
        self.stats.clone()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn machine(&self) -> &PowerStateMachine {
        &self.machine
    }

    pub fn policy(&self) -> &dyn SpinDownPolicy {
        self.policy.as_ref()
    }
}

/// Runs the workload through a fresh simulation of `policy` on `device`.
///
/// Returns the total energy in J and the average wait per request in ms, which is `None` for a workload without
/// requests.
pub fn run(device: Arc<DeviceProfile>, policy: Box<dyn SpinDownPolicy>, workload: &Workload) -> (f64, Option<f64>) {
    let stats = PolicySimulation::new(device, policy).run(workload);
    (stats.energy, stats.average_wait())
}
