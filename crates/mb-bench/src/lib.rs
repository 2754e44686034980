//! `mb-bench` - Workload generation, benchmark harness, verification and
//! reporting for matbench.

pub mod config;
pub mod entry;
pub mod error;
pub mod generator;
pub mod harness;
pub mod report;
pub mod timer;
pub mod verify;

pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use generator::{compute_reference, generate_artifacts, Workload, WorkloadGenerator};
pub use harness::{BenchmarkHarness, BenchmarkResult, BenchmarkRun, HarnessConfig, RunState};
pub use report::write_report;
pub use timer::ScopedTimer;
pub use verify::{approx_equals, exact_equals, max_abs_diff, Tolerance, Verdict};
