//! Experiment configuration.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::{DeviceProfile, RawDevice};
use crate::error::SimError;
use crate::synthetic::{generate_synthetic_workload, SyntheticWorkloadConfig};
use crate::trace::Workload;

/// Device given either by preset name (`hdd_a`, `hdd_b`, `hdd_c`) or by full description.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSpec {
    Preset(String),
    Raw(RawDevice),
}

impl DeviceSpec {
    pub fn resolve(&self) -> Result<DeviceProfile, SimError> {
        match self {
            DeviceSpec::Preset(name) => {
                DeviceProfile::preset(name).ok_or_else(|| SimError::config(format!("unknown device preset: {}", name)))
            }
            DeviceSpec::Raw(raw) => DeviceProfile::from_raw(raw),
        }
    }
}

/// Workload given either by trace file path or by synthetic generator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkloadSpec {
    File(PathBuf),
    Synthetic {
        name: String,
        synthetic: SyntheticWorkloadConfig,
    },
}

impl WorkloadSpec {
    /// Name used in experiment results.
    pub fn name(&self) -> String {
        match self {
            WorkloadSpec::File(path) => path
                .file_stem()
                .map(|x| x.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            WorkloadSpec::Synthetic { name, .. } => name.clone(),
        }
    }

    /// Loads or generates the workload. Relative paths are resolved against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<Workload, SimError> {
        match self {
            WorkloadSpec::File(path) => Workload::from_file(&base_dir.join(path)),
            WorkloadSpec::Synthetic { synthetic, .. } => generate_synthetic_workload(synthetic),
        }
    }
}

fn default_policies() -> Vec<String> {
    vec!["AlwaysStandby".to_string()]
}

/// YAML-serializable experiment config: every policy is simulated on every (device, workload) pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub devices: Vec<DeviceSpec>,
    pub workloads: Vec<WorkloadSpec>,
    /// Policy spec strings, e.g. `FixedTimeout[gamma=1000]`.
    #[serde(default = "default_policies")]
    pub policies: Vec<String>,
    /// Number of worker threads, defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl ExperimentConfig {
    pub fn from_yaml(path: &Path) -> Result<Self, SimError> {
        let f = File::open(path).map_err(|e| SimError::config(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            serde_yaml::from_reader(f).map_err(|e| SimError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SimError> {
        let config: Self = serde_yaml::from_str(s).map_err(|e| SimError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.devices.is_empty() {
            return Err(SimError::config("no devices"));
        }
        if self.workloads.is_empty() {
            return Err(SimError::config("no workloads"));
        }
        if self.policies.is_empty() {
            return Err(SimError::config("no policies"));
        }
        if self.workers == Some(0) {
            return Err(SimError::config("workers must be positive"));
        }
        Ok(())
    }

    /// Resolves all devices. An invalid device invalidates the whole experiment.
    pub fn resolve_devices(&self) -> Result<Vec<DeviceProfile>, SimError> {
        self.devices.iter().map(|d| d.resolve()).collect()
    }
}
