//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;

use mb_store::ArtifactStore;
use mb_tensor::DevicePreference;

use crate::error::{BenchError, Result};
use crate::harness::HarnessConfig;
use crate::verify::Tolerance;

pub const ENV_ARTIFACT_DIR: &str = "MATBENCH_ARTIFACT_DIR";
pub const ENV_SIZE: &str = "MATBENCH_SIZE";
pub const ENV_SEED: &str = "MATBENCH_SEED";
pub const ENV_DEVICE: &str = "MATBENCH_DEVICE";
pub const ENV_RTOL: &str = "MATBENCH_RTOL";
pub const ENV_ATOL: &str = "MATBENCH_ATOL";

pub const DEFAULT_ARTIFACT_DIR: &str = "data/matrices";
pub const DEFAULT_SIZE: usize = 1024;

/// Settings shared by the generation and benchmark entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Directory holding the `A`, `B` and `C_reference` artifacts.
    pub artifact_dir: PathBuf,
    /// Workload dimension N (matrices are N x N).
    pub size: usize,
    /// Seed for reproducible generation; entropy-seeded when `None`.
    pub seed: Option<u64>,
    pub device: DevicePreference,
    pub tolerance: Tolerance,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            size: DEFAULT_SIZE,
            seed: None,
            device: DevicePreference::Auto,
            tolerance: Tolerance::default(),
        }
    }
}

impl BenchConfig {
    /// Read the configuration from `MATBENCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a key lookup, falling back to defaults for
    /// absent or empty keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = BenchConfig::default();

        if let Some(dir) = get(ENV_ARTIFACT_DIR) {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Some(size) = get(ENV_SIZE) {
            config.size = parse(ENV_SIZE, &size)?;
            if config.size == 0 {
                return Err(invalid(ENV_SIZE, &size, "size must be positive"));
            }
        }
        if let Some(seed) = get(ENV_SEED) {
            config.seed = Some(parse(ENV_SEED, &seed)?);
        }
        if let Some(device) = get(ENV_DEVICE) {
            config.device = device
                .parse()
                .map_err(|e: mb_tensor::TensorError| invalid(ENV_DEVICE, &device, &e.to_string()))?;
        }
        if let Some(rtol) = get(ENV_RTOL) {
            config.tolerance.rtol = parse_tolerance(ENV_RTOL, &rtol)?;
        }
        if let Some(atol) = get(ENV_ATOL) {
            config.tolerance.atol = parse_tolerance(ENV_ATOL, &atol)?;
        }
        Ok(config)
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.artifact_dir)
    }

    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            tolerance: self.tolerance,
        }
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> BenchError {
    BenchError::Config {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn parse_tolerance(key: &str, value: &str) -> Result<f64> {
    let v: f64 = parse(key, value)?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(invalid(key, value, "tolerance must be finite and non-negative"))
    }
}
