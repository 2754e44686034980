//! Generate the `A`, `B` and `C_reference` artifacts.

use anyhow::Context;
use tracing::info;

use mb_bench::entry::{generate, init_logging};
use mb_bench::BenchConfig;

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = BenchConfig::from_env().context("failed to read configuration")?;
    let workload = generate(&config).with_context(|| {
        format!(
            "failed to generate workload in {}",
            config.artifact_dir.display()
        )
    })?;
    info!(
        shape = %workload.reference.shape(),
        dir = %config.artifact_dir.display(),
        "artifacts ready"
    );
    Ok(())
}
