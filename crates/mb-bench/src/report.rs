//! Human-readable rendering of a benchmark run.

use std::io::{self, Write};

use crate::harness::BenchmarkRun;

/// Number of leading first-row values shown for each matrix.
pub const SAMPLE_LEN: usize = 2;

fn format_sample(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.8}", v)).collect();
    format!("[{}]", parts.join(" "))
}

/// Write the report for `run` to `out`.
pub fn write_report(out: &mut impl Write, run: &BenchmarkRun) -> io::Result<()> {
    let result = &run.result;
    let tol = result.verdict.tolerance;

    writeln!(out, "Using device: {}", result.device)?;
    writeln!(out, "Backend: {}", result.backend)?;
    writeln!(out, "Operands: A {} @ B {}", run.a.shape(), run.b.shape())?;
    writeln!(out)?;
    writeln!(out, "--- Slices for Verification ---")?;
    writeln!(out, "Matrix A (first {} elements): {}", SAMPLE_LEN, format_sample(run.a.sample(SAMPLE_LEN)))?;
    writeln!(out, "Matrix B (first {} elements): {}", SAMPLE_LEN, format_sample(run.b.sample(SAMPLE_LEN)))?;
    writeln!(out, "Calculated C (first {} elements): {}", SAMPLE_LEN, format_sample(run.computed.sample(SAMPLE_LEN)))?;
    writeln!(out, "Actual Result (first {} elements): {}", SAMPLE_LEN, format_sample(run.reference.sample(SAMPLE_LEN)))?;
    writeln!(out)?;
    writeln!(out, "Matrices are identical: {}", result.verdict.exact)?;
    writeln!(
        out,
        "Matrices are numerically close: {} (rtol={:e}, atol={:e})",
        result.verdict.approximate, tol.rtol, tol.atol
    )?;
    match result.verdict.max_abs_diff {
        Some(d) => writeln!(out, "Max absolute difference: {:e}", d)?,
        None => writeln!(out, "Max absolute difference: n/a (shape mismatch)")?,
    }
    writeln!(out, "Matrix multiplication completed in {:.6} seconds.", result.elapsed_secs())?;
    writeln!(out, "Result matrix shape: {}", run.computed.shape())?;
    writeln!(out, "Verification: {}", if result.passed() { "PASS" } else { "FAIL" })
}
