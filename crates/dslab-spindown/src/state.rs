//! Device power-state machine.
//!
//! The machine tracks the device state, the transition timers and the number of backlogged requests, and accounts
//! energy and request wait time for every processed interval. Intervals that span several transitions are split at
//! the timer boundaries and processed phase by phase.

use std::ops::AddAssign;
use std::sync::Arc;

use log::trace;

use crate::device::{DeviceProfile, PowerState};
use crate::policy::{IdleSlot, SpinDownPolicy};

/// Energy and wait accounted for a processed (part of an) interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Consumption {
    /// Consumed energy in J.
    pub energy: f64,
    /// Cumulative wait of all requests in ms.
    pub wait: f64,
    /// Accounted time in ms.
    pub time: u64,
}

impl AddAssign for Consumption {
    fn add_assign(&mut self, rhs: Self) {
        self.energy += rhs.energy;
        self.wait += rhs.wait;
        self.time += rhs.time;
    }
}

/// Mutable state of a simulated device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationState {
    pub state: PowerState,
    /// Time left until an in-progress wake-up completes.
    pub wakeup_remaining: u64,
    /// Time left until an in-progress shutdown completes.
    pub shutdown_remaining: u64,
    /// Number of requests waiting to be served.
    pub backlog: u64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            state: PowerState::Active,
            wakeup_remaining: 0,
            shutdown_remaining: 0,
            backlog: 0,
        }
    }
}

impl SimulationState {
    /// Returns true if a wake-up or a shutdown is in progress.
    pub fn in_transition(&self) -> bool {
        self.wakeup_remaining > 0 || self.shutdown_remaining > 0
    }
}

/// Power-state machine of a single device driven by idle and busy intervals.
#[derive(Clone)]
pub struct PowerStateMachine {
    device: Arc<DeviceProfile>,
    current: SimulationState,
    clock: u64,
    shutdowns: u64,
    wakeups: u64,
}

impl PowerStateMachine {
    /// Creates a machine for an active device with no pending requests.
    pub fn new(device: Arc<DeviceProfile>) -> Self {
        Self {
            device,
            current: SimulationState::default(),
            clock: 0,
            shutdowns: 0,
            wakeups: 0,
        }
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    pub fn current(&self) -> SimulationState {
        self.current
    }

    pub fn state(&self) -> PowerState {
        self.current.state
    }

    pub fn backlog(&self) -> u64 {
        self.current.backlog
    }

    /// Total time accounted by the machine since its creation, ms.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Number of initiated shutdowns.
    pub fn shutdowns(&self) -> u64 {
        self.shutdowns
    }

    /// Number of initiated wake-ups.
    pub fn wakeups(&self) -> u64 {
        self.wakeups
    }

    /// Processes an idle interval: drains the backlog left by previous busy intervals and lets the policy decide
    /// what to do with the rest of the interval.
    pub fn process_idle(&mut self, length: u64, policy: &mut dyn SpinDownPolicy) -> Consumption {
        let start = self.clock;
        let (mut total, remaining) = self.clear_backlog(length);
        if remaining > 0 {
            if self.current.state == PowerState::Active && !self.current.in_transition() {
                self.current.state = PowerState::Standby;
            }
            let energy = policy.decide(
                IdleSlot {
                    interval: length,
                    remaining,
                },
                self,
            );
            total.energy += energy;
            total.time = self.clock - start;
            debug_assert_eq!(
                total.time,
                length,
                "policy {} did not account the whole idle interval",
                policy.to_string()
            );
        }
        total
    }

    /// Processes a busy interval with `length` requests arriving one per ms.
    ///
    /// Requests arriving during a transition wait until the device becomes active. A sleeping device is woken up,
    /// a device in standby becomes active immediately.
    pub fn process_busy(&mut self, length: u64) -> Consumption {
        let mut total = Consumption::default();
        let mut rest = length;
        while rest > 0 {
            self.begin_service();
            let step = if self.current.wakeup_remaining > 0 {
                let t = rest.min(self.current.wakeup_remaining);
                let step = Consumption {
                    energy: t as f64 * self.device.wakeup_power(),
                    wait: arrivals_wait(t) + self.current.backlog as f64 * t as f64,
                    time: t,
                };
                self.current.wakeup_remaining -= t;
                if self.current.wakeup_remaining == 0 {
                    self.complete_wakeup();
                } else {
                    self.current.backlog += t;
                }
                step
            } else if self.current.shutdown_remaining > 0 {
                let t = rest.min(self.current.shutdown_remaining);
                let step = Consumption {
                    energy: t as f64 * self.device.shutdown_power(),
                    wait: arrivals_wait(t) + self.current.backlog as f64 * t as f64,
                    time: t,
                };
                self.current.shutdown_remaining -= t;
                self.current.backlog += t;
                if self.current.shutdown_remaining == 0 {
                    self.complete_shutdown();
                }
                step
            } else {
                let step = Consumption {
                    energy: rest as f64 * self.device.active_power(),
                    wait: self.current.backlog as f64,
                    time: rest,
                };
                self.current.backlog = 0;
                step
            };
            rest -= step.time;
            total += step;
        }
        self.clock += total.time;
        total
    }

    /// Serves the backlogged requests during an idle interval.
    ///
    /// Returns the consumption and the part of the interval left after the backlog is cleared. No requests arrive
    /// during an idle interval, so the wait grows linearly with the backlog size.
    pub fn clear_backlog(&mut self, length: u64) -> (Consumption, u64) {
        let mut total = Consumption::default();
        let mut rest = length;
        while self.current.backlog > 0 && rest > 0 {
            self.begin_service();
            let step = if self.current.wakeup_remaining > 0 {
                let t = rest.min(self.current.wakeup_remaining);
                let step = Consumption {
                    energy: t as f64 * self.device.wakeup_power(),
                    wait: self.current.backlog as f64 * t as f64,
                    time: t,
                };
                self.current.wakeup_remaining -= t;
                if self.current.wakeup_remaining == 0 {
                    self.complete_wakeup();
                }
                step
            } else if self.current.shutdown_remaining > 0 {
                let t = rest.min(self.current.shutdown_remaining);
                let step = Consumption {
                    energy: t as f64 * self.device.shutdown_power(),
                    wait: self.current.backlog as f64 * t as f64,
                    time: t,
                };
                self.current.shutdown_remaining -= t;
                if self.current.shutdown_remaining == 0 {
                    self.complete_shutdown();
                }
                step
            } else {
                // the whole queue is served in a single time unit
                let step = Consumption {
                    energy: self.device.active_power(),
                    wait: self.current.backlog as f64,
                    time: 1,
                };
                self.current.backlog = 0;
                step
            };
            rest -= step.time;
            total += step;
        }
        self.clock += total.time;
        (total, rest)
    }

    /// Keeps the device in its current low-power regime for `length` ms and returns the consumed energy.
    ///
    /// An idle device stays in standby. A shutdown already in progress is not interrupted, and a sleeping device
    /// keeps sleeping.
    pub fn standby(&mut self, length: u64) -> f64 {
        if length == 0 {
            return 0.;
        }
        self.check_timers();
        if self.current.shutdown_remaining > 0 || self.current.state == PowerState::Sleeping {
            return self.sleep(length);
        }
        assert_eq!(
            self.current.wakeup_remaining, 0,
            "standby requested while the device is waking up"
        );
        self.current.state = PowerState::Standby;
        self.clock += length;
        length as f64 * self.device.standby_power()
    }

    /// Initiates a shutdown and keeps the device shut down for the rest of `length` ms, returns the consumed
    /// energy.
    ///
    /// With `length == 0` the shutdown is still started and continues in the following intervals.
    pub fn shutdown(&mut self, length: u64) -> f64 {
        self.check_timers();
        assert_eq!(
            self.current.wakeup_remaining, 0,
            "shutdown requested while the device is waking up"
        );
        if self.current.state != PowerState::Sleeping && self.current.shutdown_remaining == 0 {
            self.shutdowns += 1;
            self.current.state = PowerState::Standby;
            let duration = self.device.shutdown_duration();
            trace!("shutdown started at {} ms, {} ms to sleep", self.clock, duration);
            if duration == 0 {
                self.complete_shutdown();
            } else {
                self.current.shutdown_remaining = duration;
            }
        }
        self.sleep(length)
    }

    fn sleep(&mut self, length: u64) -> f64 {
        let mut energy = 0.;
        let mut rest = length;
        if self.current.shutdown_remaining > 0 {
            let t = rest.min(self.current.shutdown_remaining);
            energy += t as f64 * self.device.shutdown_power();
            self.current.shutdown_remaining -= t;
            rest -= t;
            if self.current.shutdown_remaining == 0 {
                self.complete_shutdown();
            }
        }
        energy += rest as f64 * self.device.sleeping_power();
        self.clock += length;
        energy
    }

    /// Makes the device able to serve requests: a sleeping device starts waking up, a device in standby becomes
    /// active. Does nothing while a transition is in progress.
    fn begin_service(&mut self) {
        self.check_timers();
        if self.current.in_transition() {
            return;
        }
        match self.current.state {
            PowerState::Sleeping => {
                self.wakeups += 1;
                let duration = self.device.wakeup_duration();
                trace!("wake-up started at {} ms, {} ms to active", self.clock, duration);
                if duration == 0 {
                    self.complete_wakeup();
                } else {
                    self.current.wakeup_remaining = duration;
                }
            }
            PowerState::Standby => {
                self.current.state = PowerState::Active;
            }
            PowerState::Active => {}
        }
    }

    fn complete_wakeup(&mut self) {
        trace!("device is active, {} backlogged requests served", self.current.backlog);
        self.current.wakeup_remaining = 0;
        self.current.backlog = 0;
        self.current.state = PowerState::Active;
    }

    fn complete_shutdown(&mut self) {
        trace!("device is sleeping, {} requests backlogged", self.current.backlog);
        self.current.shutdown_remaining = 0;
        self.current.state = PowerState::Sleeping;
    }

    fn check_timers(&self) {
        assert!(
            self.current.wakeup_remaining == 0 || self.current.shutdown_remaining == 0,
            "inconsistent transition timers: wake-up {} ms, shutdown {} ms",
            self.current.wakeup_remaining,
            self.current.shutdown_remaining
        );
    }
}

/// Cumulative wait of requests arriving one per ms during `t` ms, each waiting until the end of the period.
fn arrivals_wait(t: u64) -> f64 {
    let t = t as f64;
    t * (t + 1.) / 2.
}
