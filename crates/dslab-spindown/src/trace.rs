//! Workload traces.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// A single interval of a workload trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interval {
    /// No requests arrive during the given number of ms.
    Idle(u64),
    /// The given number of requests arrive, one per ms.
    Busy(u64),
}

impl Interval {
    /// Decodes a signed interval length: negative is idle, positive is busy, zero is nothing.
    pub fn from_signed(value: i64) -> Option<Self> {
        match value {
            v if v < 0 => Some(Interval::Idle(v.unsigned_abs())),
            v if v > 0 => Some(Interval::Busy(v as u64)),
            _ => None,
        }
    }

    pub fn length(&self) -> u64 {
        match self {
            Interval::Idle(len) | Interval::Busy(len) => *len,
        }
    }
}

/// Sequence of alternating idle and busy intervals, stored as signed lengths in ms.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workload {
    intervals: Vec<i64>,
}

impl Workload {
    pub fn new(intervals: Vec<i64>) -> Self {
        Self { intervals }
    }

    /// Raw signed interval lengths.
    pub fn raw(&self) -> &[i64] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Iterates over non-empty intervals.
    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.intervals.iter().filter_map(|x| Interval::from_signed(*x))
    }

    /// Total number of requests, i.e. the sum of busy interval lengths.
    pub fn request_count(&self) -> u64 {
        self.iter()
            .map(|x| match x {
                Interval::Busy(len) => len,
                Interval::Idle(_) => 0,
            })
            .sum()
    }

    /// Total length of the trace in ms.
    pub fn duration(&self) -> u64 {
        self.iter().map(|x| x.length()).sum()
    }

    /// Loads a trace from a file.
    ///
    /// `.json` files hold a JSON array, `.yaml`/`.yml` files hold a YAML sequence, any other file is read as
    /// integers separated by whitespace or commas. A trace without intervals is an error.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let contents = fs::read_to_string(path).map_err(|e| SimError::trace(path, e))?;
        let extension = path.extension().and_then(|x| x.to_str()).unwrap_or("");
        let workload = match extension {
            "json" => serde_json::from_str(&contents).map_err(|e| SimError::trace(path, e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| SimError::trace(path, e))?,
            _ => Self::parse_text(&contents).map_err(|e| SimError::trace(path, e))?,
        };
        if workload.iter().next().is_none() {
            return Err(SimError::trace(path, "no intervals"));
        }
        Ok(workload)
    }

    /// Saves the trace as a JSON array.
    pub fn save_json(&self, path: &Path) -> Result<(), SimError> {
        let contents = serde_json::to_string(self).map_err(|e| SimError::trace(path, e))?;
        fs::write(path, contents).map_err(|e| SimError::trace(path, e))
    }

    fn parse_text(contents: &str) -> Result<Self, String> {
        let mut intervals = Vec::new();
        for token in contents.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let value = token
                .parse::<i64>()
                .map_err(|_| format!("invalid interval length: {}", token))?;
            intervals.push(value);
        }
        Ok(Self { intervals })
    }
}

impl From<Vec<i64>> for Workload {
    fn from(intervals: Vec<i64>) -> Self {
        Self::new(intervals)
    }
}
