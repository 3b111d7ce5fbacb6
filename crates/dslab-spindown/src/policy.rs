//! Spin-down policies.
//!
//! A policy is consulted once per idle interval, after the backlog left by the previous busy interval has been
//! served, and decides how the device spends the rest of the interval: in standby, or shut down after some delay.

use std::collections::HashMap;
use std::str::FromStr;

use dyn_clone::{clone_trait_object, DynClone};
use sugars::boxed;

use crate::device::DeviceProfile;
use crate::error::SimError;
use crate::moving_average::MovingAveragePolicy;
use crate::pattern::PatternPolicy;
use crate::state::PowerStateMachine;
use crate::supervised::SupervisedPolicy;
use crate::trace::Workload;

/// The part of an idle interval handed to a policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleSlot {
    /// Length of the whole idle interval.
    pub interval: u64,
    /// Time left after clearing the backlog, always positive.
    pub remaining: u64,
}

impl IdleSlot {
    /// Time of the interval already spent serving backlogged requests.
    pub fn spent(&self) -> u64 {
        self.interval - self.remaining
    }
}

pub trait SpinDownPolicy: DynClone + Send {
    /// Spends `idle.remaining` ms using the machine primitives
    /// ([`PowerStateMachine::standby`], [`PowerStateMachine::shutdown`]) and returns the consumed energy.
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64;

    /// Called after each busy interval.
    fn observe_busy(&mut self, _length: u64) {}

    /// Called after each idle interval, including the ones spent entirely on the backlog.
    fn observe_idle(&mut self, _length: u64) {}

    fn to_string(&self) -> String {
        "STUB POLICY NAME".to_string()
    }
}

clone_trait_object!(SpinDownPolicy);

/// Never shuts the device down.
#[derive(Clone, Default)]
pub struct AlwaysStandbyPolicy {}

impl SpinDownPolicy for AlwaysStandbyPolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        machine.standby(idle.remaining)
    }

    fn to_string(&self) -> String {
        "AlwaysStandby".to_string()
    }
}

/// Shuts the device down after it has been idle for `gamma` ms.
#[derive(Clone)]
pub struct FixedTimeoutPolicy {
    gamma: u64,
}

impl FixedTimeoutPolicy {
    pub fn new(gamma: u64) -> Self {
        Self { gamma }
    }

    pub fn from_options_map(options: &HashMap<String, String>) -> Result<Self, SimError> {
        Ok(Self::new(required_option(options, "gamma")?))
    }
}

impl SpinDownPolicy for FixedTimeoutPolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        if idle.remaining >= self.gamma {
            let energy = machine.standby(self.gamma);
            energy + machine.shutdown(idle.remaining - self.gamma)
        } else {
            machine.standby(idle.remaining)
        }
    }

    fn to_string(&self) -> String {
        format!("FixedTimeout[gamma={}]", self.gamma)
    }
}

/// Shuts the device down immediately if the previous busy interval was not longer than `theta` ms.
#[derive(Clone)]
pub struct ShortBurstPolicy {
    theta: u64,
    prev_busy: u64,
}

impl ShortBurstPolicy {
    pub fn new(theta: u64) -> Self {
        Self {
            theta,
            prev_busy: theta.saturating_add(1),
        }
    }

    pub fn from_options_map(options: &HashMap<String, String>) -> Result<Self, SimError> {
        Ok(Self::new(required_option(options, "theta")?))
    }
}

impl SpinDownPolicy for ShortBurstPolicy {
    fn decide(&mut self, idle: IdleSlot, machine: &mut PowerStateMachine) -> f64 {
        if self.prev_busy <= self.theta {
            machine.shutdown(idle.remaining)
        } else {
            machine.standby(idle.remaining)
        }
    }

    fn observe_busy(&mut self, length: u64) {
        self.prev_busy = length;
    }

    fn to_string(&self) -> String {
        format!("ShortBurst[theta={}]", self.theta)
    }
}

/// Parses `key=value` pairs separated by commas.
pub fn parse_options(s: &str) -> HashMap<String, String> {
    let mut ans = HashMap::new();
    for t in s.split(',') {
        if let Some((l, r)) = t.split_once('=') {
            ans.insert(l.trim().to_string(), r.trim().to_string());
        }
    }
    ans
}

/// Splits a policy spec string like `FixedTimeout[gamma=1000]` into the policy name and its options.
pub fn split_spec(s: &str) -> Result<(&str, HashMap<String, String>), SimError> {
    let s = s.trim();
    match s.find('[') {
        None => Ok((s, HashMap::new())),
        Some(pos) if s.ends_with(']') => Ok((&s[..pos], parse_options(&s[pos + 1..s.len() - 1]))),
        Some(_) => Err(SimError::config(format!("malformed policy spec: {}", s))),
    }
}

pub(crate) fn option<T: FromStr>(options: &HashMap<String, String>, key: &str, default: T) -> Result<T, SimError> {
    match options.get(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| SimError::config(format!("invalid value of option {}: {}", key, value))),
        None => Ok(default),
    }
}

pub(crate) fn required_option<T: FromStr>(options: &HashMap<String, String>, key: &str) -> Result<T, SimError> {
    let value = options
        .get(key)
        .ok_or_else(|| SimError::config(format!("missing option {}", key)))?;
    value
        .parse::<T>()
        .map_err(|_| SimError::config(format!("invalid value of option {}: {}", key, value)))
}

/// Builds a policy from its spec string.
///
/// The supervised policy is fitted on `training` (usually the workload it is going to be evaluated on).
pub fn default_policy_resolver(
    s: &str,
    device: &DeviceProfile,
    training: &Workload,
) -> Result<Box<dyn SpinDownPolicy>, SimError> {
    let (name, opts) = split_spec(s)?;
    let policy: Box<dyn SpinDownPolicy> = match name {
        "AlwaysStandby" => Box::<AlwaysStandbyPolicy>::default(),
        "FixedTimeout" => boxed!(FixedTimeoutPolicy::from_options_map(&opts)?),
        "PatternPredictor" => boxed!(PatternPolicy::from_options_map(&opts, device)?),
        "MovingAverage" => boxed!(MovingAveragePolicy::from_options_map(&opts, device)?),
        "Supervised" => boxed!(SupervisedPolicy::from_options_map(&opts, device, training)?),
        "ShortBurst" => boxed!(ShortBurstPolicy::from_options_map(&opts)?),
        _ => return Err(SimError::config(format!("can't resolve policy: {}", s))),
    };
    Ok(policy)
}
