//! Simulation errors.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Errors reported by the fallible layers around the simulator (configuration, traces, result normalization).
///
/// Violations of the state machine invariants are not represented here: they are programming errors and panic.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid device description, policy spec string or experiment config.
    Config(String),
    /// Workload trace that cannot be read or contains no intervals.
    Trace {
        /// Where the trace was loaded from.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
    /// The workload contains no busy intervals, so the average wait per request is undefined.
    NoRequests,
}

impl SimError {
    pub(crate) fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn trace<S: ToString>(path: &Path, reason: S) -> Self {
        Self::Trace {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Config(message) => write!(f, "invalid configuration: {}", message),
            SimError::Trace { path, reason } => write!(f, "cannot load trace {}: {}", path.display(), reason),
            SimError::NoRequests => f.write_str("workload has no requests"),
        }
    }
}

impl std::error::Error for SimError {}
