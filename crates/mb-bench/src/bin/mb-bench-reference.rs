//! Benchmark the reference CPU backend against the stored ground truth.

use std::process::ExitCode;

use anyhow::Context;
use tracing::error;

use mb_bench::entry::{benchmark, exit_code, init_logging};
use mb_bench::BenchConfig;
use mb_tensor::reference_backend;

fn run() -> anyhow::Result<ExitCode> {
    let config = BenchConfig::from_env().context("failed to read configuration")?;
    let run = benchmark(&config, reference_backend()).context("reference benchmark failed")?;
    Ok(exit_code(&run))
}

fn main() -> ExitCode {
    init_logging();
    run().unwrap_or_else(|e| {
        error!("{:#}", e);
        ExitCode::FAILURE
    })
}
