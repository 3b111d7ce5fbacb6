//! Utilities for running many simulations in parallel.
#![allow(clippy::type_complexity)]

use std::io;
use std::path::Path;
use std::sync::{mpsc::channel, Arc};

use itertools::iproduct;
use log::{info, warn};
use serde::Serialize;
use threadpool::ThreadPool;

use crate::config::ExperimentConfig;
use crate::device::DeviceProfile;
use crate::error::SimError;
use crate::policy::{default_policy_resolver, SpinDownPolicy};
use crate::simulation::PolicySimulation;
use crate::stats::SimulationStats;
use crate::trace::Workload;

/// Builds a policy from its spec string for the given device and training workload.
pub type PolicyResolver =
    dyn Fn(&str, &DeviceProfile, &Workload) -> Result<Box<dyn SpinDownPolicy>, SimError> + Send + Sync;

/// Workload shared between simulations. A workload that failed to load is kept to report the failure.
pub struct NamedWorkload {
    pub name: String,
    pub workload: Result<Arc<Workload>, SimError>,
}

impl NamedWorkload {
    pub fn new<S: Into<String>>(name: S, workload: Result<Workload, SimError>) -> Self {
        Self {
            name: name.into(),
            workload: workload.map(Arc::new),
        }
    }
}

/// Result of simulating one (device, workload, policy) combination.
#[derive(Clone, Debug)]
pub struct ExperimentResult {
    pub device: String,
    pub workload: String,
    pub policy: String,
    /// Simulation totals, or the reason why the combination has no result.
    pub outcome: Result<SimulationStats, SimError>,
}

/// Flat representation of [`ExperimentResult`] for CSV and JSON output.
#[derive(Clone, Debug, Serialize)]
pub struct ResultRow {
    pub device: String,
    pub workload: String,
    pub policy: String,
    pub energy_wh: Option<f64>,
    pub avg_wait_s: Option<f64>,
    pub shutdowns: Option<u64>,
    pub wakeups: Option<u64>,
    pub error: Option<String>,
}

impl ExperimentResult {
    pub fn row(&self) -> ResultRow {
        let stats = self.outcome.as_ref().ok();
        ResultRow {
            device: self.device.clone(),
            workload: self.workload.clone(),
            policy: self.policy.clone(),
            energy_wh: stats.map(|s| s.energy_wh()),
            avg_wait_s: stats.and_then(|s| s.average_wait_seconds()),
            shutdowns: stats.map(|s| s.shutdowns),
            wakeups: stats.map(|s| s.wakeups),
            error: self.outcome.as_ref().err().map(|e| e.to_string()),
        }
    }
}

fn simulate(
    device: Arc<DeviceProfile>,
    workload: &Result<Arc<Workload>, SimError>,
    policy: &str,
    resolver: &PolicyResolver,
) -> Result<SimulationStats, SimError> {
    let workload = workload.as_ref().map_err(|e| e.clone())?;
    let policy = resolver(policy, &device, workload)?;
    let stats = PolicySimulation::new(device, policy).run(workload);
    if stats.requests == 0 {
        return Err(SimError::NoRequests);
    }
    Ok(stats)
}

/// Simulates every policy on every (device, workload) pair in a thread pool with `n_workers` worker threads.
///
/// Results are ordered by device, then workload, then policy. Failures of individual combinations are reported in
/// their results and do not affect other combinations.
pub fn parallel_experiment_n_workers(
    devices: Vec<DeviceProfile>,
    workloads: Vec<NamedWorkload>,
    policies: Vec<String>,
    resolver: Arc<PolicyResolver>,
    n_workers: usize,
) -> Vec<ExperimentResult> {
    assert!(n_workers > 0, "There should be at least one worker.");
    let devices: Vec<Arc<DeviceProfile>> = devices.into_iter().map(Arc::new).collect();
    let workloads: Vec<Arc<NamedWorkload>> = workloads.into_iter().map(Arc::new).collect();
    let pool = ThreadPool::new(n_workers);
    let (tx, rx) = channel();
    let mut len = 0;
    for (id, (device, workload, policy)) in iproduct!(devices.iter(), workloads.iter(), policies.iter()).enumerate() {
        let tx = tx.clone();
        let device = device.clone();
        let workload = workload.clone();
        let policy = policy.clone();
        let resolver = resolver.clone();
        len += 1;
        pool.execute(move || {
            let outcome = simulate(device.clone(), &workload.workload, &policy, resolver.as_ref());
            if let Err(e) = &outcome {
                warn!("no result for {} / {} / {}: {}", device.name(), workload.name, policy, e);
            }
            let result = ExperimentResult {
                device: device.name().to_string(),
                workload: workload.name.clone(),
                policy,
                outcome,
            };
            // the receiver lives until all results are collected
            let _ = tx.send((id, result));
        });
    }
    drop(tx);
    let mut results: Vec<_> = rx.iter().take(len).collect();
    assert_eq!(results.len(), len, "simulation worker panicked");
    results.sort_by_key(|x| x.0);
    results.into_iter().map(|x| x.1).collect()
}

/// Runs the experiment described by `config`, loading workloads relative to `base_dir`.
pub fn parallel_experiment(
    config: &ExperimentConfig,
    base_dir: &Path,
    resolver: Arc<PolicyResolver>,
) -> Result<Vec<ExperimentResult>, SimError> {
    let devices = config.resolve_devices()?;
    let workloads: Vec<NamedWorkload> = config
        .workloads
        .iter()
        .map(|w| NamedWorkload::new(w.name(), w.load(base_dir)))
        .collect();
    let n_workers = config
        .workers
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));
    info!(
        "running {} devices x {} workloads x {} policies on {} workers",
        devices.len(),
        workloads.len(),
        config.policies.len(),
        n_workers
    );
    Ok(parallel_experiment_n_workers(
        devices,
        workloads,
        config.policies.clone(),
        resolver,
        n_workers,
    ))
}

/// Same as [`parallel_experiment`] with the default policy resolver.
pub fn parallel_experiment_default(
    config: &ExperimentConfig,
    base_dir: &Path,
) -> Result<Vec<ExperimentResult>, SimError> {
    parallel_experiment(config, base_dir, Arc::new(default_policy_resolver))
}

/// Writes the results as CSV, one row per combination.
pub fn write_csv<W: io::Write>(results: &[ExperimentResult], writer: W) -> Result<(), SimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in results {
        wtr.serialize(result.row())
            .map_err(|e| SimError::config(format!("cannot write results: {}", e)))?;
    }
    wtr.flush()
        .map_err(|e| SimError::config(format!("cannot write results: {}", e)))
}
