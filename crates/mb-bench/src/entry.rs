//! Shared plumbing for the process entry points.

use std::io::{self, Write};
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use mb_tensor::ComputeBackend;

use crate::config::BenchConfig;
use crate::error::Result;
use crate::generator::{generate_artifacts, Workload};
use crate::harness::{BenchmarkHarness, BenchmarkRun};
use crate::report::write_report;

/// Install the stderr log subscriber, honouring `RUST_LOG` (default `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Generate and persist the workload described by `config`.
pub fn generate(config: &BenchConfig) -> Result<Workload> {
    generate_artifacts(&config.store(), config.size, config.seed)
}

/// Benchmark `backend` against the stored workload and print the report.
pub fn benchmark(config: &BenchConfig, backend: Box<dyn ComputeBackend>) -> Result<BenchmarkRun> {
    info!(backend = backend.name(), device = %backend.device(), "starting benchmark");
    let mut harness = BenchmarkHarness::new(config.store(), backend, config.harness_config());
    let run = harness.run()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &run)?;
    out.flush()?;
    Ok(run)
}

/// Zero if the run verified, non-zero otherwise.
pub fn exit_code(run: &BenchmarkRun) -> ExitCode {
    if run.result.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
