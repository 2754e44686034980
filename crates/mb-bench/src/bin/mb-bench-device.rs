//! Benchmark the accelerator-capable backend on the best available device.

use std::process::ExitCode;

use anyhow::Context;
use tracing::error;

use mb_bench::entry::{benchmark, exit_code, init_logging};
use mb_bench::BenchConfig;
use mb_tensor::{accelerated_backend, probe_device};

fn run() -> anyhow::Result<ExitCode> {
    let config = BenchConfig::from_env().context("failed to read configuration")?;
    let device = probe_device(config.device);
    let backend = accelerated_backend(device).context("failed to initialize backend")?;
    let run = benchmark(&config, backend).context("device benchmark failed")?;
    Ok(exit_code(&run))
}

fn main() -> ExitCode {
    init_logging();
    run().unwrap_or_else(|e| {
        error!("{:#}", e);
        ExitCode::FAILURE
    })
}
