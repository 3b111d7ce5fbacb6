//! Storage device power profile.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Power states of the simulated device.
///
/// Transitions between [`PowerState::Standby`] and [`PowerState::Sleeping`] (shutdown) and back to
/// [`PowerState::Active`] (wake-up) take time and are modeled by the state machine timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    /// The disk spins at full speed serving requests.
    Active,
    /// The disk is spinning but does not serve requests.
    Standby,
    /// The disk is spun down.
    Sleeping,
}

/// Device description in datasheet units: power in W, transition times in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawDevice {
    pub name: String,
    /// Capacity in GB, informational only.
    #[serde(default)]
    pub capacity: f64,
    pub sleeping_power: f64,
    pub standby_power: f64,
    pub active_power: f64,
    pub shutdown_time: f64,
    pub wakeup_time: f64,
    pub shutdown_power: f64,
    pub wakeup_power: f64,
}

/// Immutable power and timing constants of a device.
///
/// Power values are stored in J/ms and durations in ms, which is the time unit of workload traces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeviceProfile {
    name: String,
    capacity: f64,
    sleeping_power: f64,
    standby_power: f64,
    active_power: f64,
    shutdown_power: f64,
    wakeup_power: f64,
    shutdown_duration: u64,
    wakeup_duration: u64,
    break_even_threshold: f64,
}

impl DeviceProfile {
    /// Creates a device profile from values already expressed in J/ms and ms.
    ///
    /// Fails if some value is negative or not finite, or if sleeping does not save power compared to standby.
    #[allow(clippy::too_many_arguments)]
    pub fn new<S: Into<String>>(
        name: S,
        capacity: f64,
        sleeping_power: f64,
        standby_power: f64,
        active_power: f64,
        shutdown_duration: u64,
        wakeup_duration: u64,
        shutdown_power: f64,
        wakeup_power: f64,
    ) -> Result<Self, SimError> {
        let name = name.into();
        let powers = [
            ("sleeping_power", sleeping_power),
            ("standby_power", standby_power),
            ("active_power", active_power),
            ("shutdown_power", shutdown_power),
            ("wakeup_power", wakeup_power),
        ];
        for (field, value) in powers {
            if !value.is_finite() || value < 0. {
                return Err(SimError::config(format!("device {}: {} = {}", name, field, value)));
            }
        }
        if standby_power <= sleeping_power {
            return Err(SimError::config(format!(
                "device {}: standby power {} must exceed sleeping power {}",
                name, standby_power, sleeping_power
            )));
        }
        let break_even_threshold = break_even_threshold(
            sleeping_power,
            standby_power,
            active_power,
            shutdown_duration,
            wakeup_duration,
            shutdown_power,
            wakeup_power,
        );
        Ok(Self {
            name,
            capacity,
            sleeping_power,
            standby_power,
            active_power,
            shutdown_power,
            wakeup_power,
            shutdown_duration,
            wakeup_duration,
            break_even_threshold,
        })
    }

    /// Creates a device profile from datasheet units (W and seconds).
    pub fn from_raw(raw: &RawDevice) -> Result<Self, SimError> {
        for (field, value) in [("shutdown_time", raw.shutdown_time), ("wakeup_time", raw.wakeup_time)] {
            if !value.is_finite() || value < 0. {
                return Err(SimError::config(format!("device {}: {} = {}", raw.name, field, value)));
            }
        }
        Self::new(
            raw.name.clone(),
            raw.capacity,
            raw.sleeping_power / 1000.,
            raw.standby_power / 1000.,
            raw.active_power / 1000.,
            (raw.shutdown_time * 1000.).round() as u64,
            (raw.wakeup_time * 1000.).round() as u64,
            raw.shutdown_power / 1000.,
            raw.wakeup_power / 1000.,
        )
    }

    /// Returns one of the built-in device profiles by name (`hdd_a`, `hdd_b` or `hdd_c`, case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hdd_a" => Some(Self::hdd_a()),
            "hdd_b" => Some(Self::hdd_b()),
            "hdd_c" => Some(Self::hdd_c()),
            _ => None,
        }
    }

    /// A small low-power drive (6.4 GB) with fast shutdown and slow wake-up.
    pub fn hdd_a() -> Self {
        Self::builtin(RawDevice {
            name: "HDD_A".to_string(),
            capacity: 6.4,
            sleeping_power: 0.75,
            standby_power: 3.48,
            active_power: 3.48,
            shutdown_time: 0.51,
            wakeup_time: 6.97,
            shutdown_power: 2.12,
            wakeup_power: 7.53,
        })
    }

    /// A 500 GB desktop drive.
    pub fn hdd_b() -> Self {
        Self::builtin(RawDevice {
            name: "HDD_B".to_string(),
            capacity: 500.,
            sleeping_power: 0.8,
            standby_power: 9.3,
            active_power: 13.,
            shutdown_time: 10.,
            wakeup_time: 15.,
            shutdown_power: 9.3,
            wakeup_power: 24.,
        })
    }

    /// A 2 TB drive with an expensive spin-up.
    pub fn hdd_c() -> Self {
        Self::builtin(RawDevice {
            name: "HDD_C".to_string(),
            capacity: 2000.,
            sleeping_power: 0.25,
            standby_power: 2.8,
            active_power: 3.7,
            shutdown_time: 10.,
            wakeup_time: 8.,
            shutdown_power: 12.,
            wakeup_power: 30.,
        })
    }

    fn builtin(raw: RawDevice) -> Self {
        match Self::from_raw(&raw) {
            Ok(profile) => profile,
            Err(e) => panic!("built-in device {} is invalid: {}", raw.name, e),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn sleeping_power(&self) -> f64 {
        self.sleeping_power
    }

    pub fn standby_power(&self) -> f64 {
        self.standby_power
    }

    pub fn active_power(&self) -> f64 {
        self.active_power
    }

    pub fn shutdown_power(&self) -> f64 {
        self.shutdown_power
    }

    pub fn wakeup_power(&self) -> f64 {
        self.wakeup_power
    }

    pub fn shutdown_duration(&self) -> u64 {
        self.shutdown_duration
    }

    pub fn wakeup_duration(&self) -> u64 {
        self.wakeup_duration
    }

    /// Returns the minimum idle interval length (ms) for which a shutdown followed by a wake-up consumes less energy
    /// than staying in standby for the whole interval.
    pub fn break_even_threshold(&self) -> f64 {
        self.break_even_threshold
    }
}

fn break_even_threshold(
    sleeping_power: f64,
    standby_power: f64,
    active_power: f64,
    shutdown_duration: u64,
    wakeup_duration: u64,
    shutdown_power: f64,
    wakeup_power: f64,
) -> f64 {
    let t_sd = shutdown_duration as f64;
    let t_wu = wakeup_duration as f64;
    let overhead = t_sd * (shutdown_power - standby_power) + t_wu * (wakeup_power - active_power);
    f64::max(0., overhead / (standby_power - sleeping_power)) + t_sd
}
