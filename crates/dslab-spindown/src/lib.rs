//! A library for evaluating spin-down policies of storage devices.
//!
//! A device with active, standby and sleeping states and non-zero transition times is driven by a workload trace of
//! alternating idle and busy intervals. During each idle interval a pluggable policy decides whether to shut the device
//! down; the simulator accounts the consumed energy and the wait of requests arriving while the device is asleep or
//! in transition.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dslab_spindown::device::DeviceProfile;
//! use dslab_spindown::policy::FixedTimeoutPolicy;
//! use dslab_spindown::simulation::PolicySimulation;
//! use dslab_spindown::trace::Workload;
//!
//! let device = Arc::new(DeviceProfile::hdd_a());
//! let workload = Workload::new(vec![-20000, 5000, -100]);
//! let mut sim = PolicySimulation::new(device, Box::new(FixedTimeoutPolicy::new(1000)));
//! let stats = sim.run(&workload);
//! println!("energy = {} Wh, wait = {:?} s", stats.energy_wh(), stats.average_wait_seconds());
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod logistic;
pub mod moving_average;
pub mod parallel;
pub mod pattern;
pub mod policy;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod supervised;
pub mod synthetic;
pub mod trace;
