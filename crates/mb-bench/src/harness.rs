//! Benchmark harness: loads a workload, times one backend and verifies the
//! result against the stored ground truth.
//!
//! A run moves through `Idle -> InputsLoaded -> Transferred -> Timing ->
//! Completed`. For asynchronous backends the timed interval is bracketed by
//! synchronization barriers, so it covers the device work itself rather than
//! just its enqueueing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use mb_store::{ArtifactRole, ArtifactStore};
use mb_tensor::{Agreement, ComputeBackend, Device, Matrix};

use crate::error::{BenchError, Result};
use crate::timer::ScopedTimer;
use crate::verify::{self, Tolerance, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    InputsLoaded,
    Transferred,
    Timing,
    Completed,
}

/// Explicit harness settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HarnessConfig {
    pub tolerance: Tolerance,
}

/// Outcome of timing and verifying one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub backend: String,
    pub device: Device,
    pub elapsed: Duration,
    pub verdict: Verdict,
    /// The verdict that decides whether the run passed.
    pub expected: Agreement,
}

impl BenchmarkResult {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn exact_match(&self) -> bool {
        self.verdict.exact
    }

    pub fn approx_match(&self) -> bool {
        self.verdict.approximate
    }

    pub fn passed(&self) -> bool {
        match self.expected {
            Agreement::Exact => self.verdict.exact,
            Agreement::Approximate => self.verdict.approximate,
        }
    }
}

/// A completed run: the result plus the matrices it was computed from.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub result: BenchmarkResult,
    pub a: Arc<Matrix>,
    pub b: Arc<Matrix>,
    pub reference: Matrix,
    pub computed: Matrix,
}

struct Inputs {
    a: Arc<Matrix>,
    b: Arc<Matrix>,
    reference: Matrix,
}

pub struct BenchmarkHarness {
    store: ArtifactStore,
    backend: Box<dyn ComputeBackend>,
    config: HarnessConfig,
    state: RunState,
    inputs: Option<Inputs>,
    elapsed: Option<Duration>,
}

impl BenchmarkHarness {
    pub fn new(
        store: ArtifactStore,
        backend: Box<dyn ComputeBackend>,
        config: HarnessConfig,
    ) -> Self {
        BenchmarkHarness {
            store,
            backend,
            config,
            state: RunState::Idle,
            inputs: None,
            elapsed: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Elapsed time of the most recent timed section, recorded even if the
    /// backend failed inside it.
    pub fn last_elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Run the whole protocol and verify the product.
    pub fn run(&mut self) -> Result<BenchmarkRun> {
        self.load_inputs()?;
        self.transfer()?;
        self.time_multiply()?;
        self.finish()
    }

    /// `Idle -> InputsLoaded`: read `A`, `B` and `C_reference` from the store.
    pub fn load_inputs(&mut self) -> Result<()> {
        self.expect_ready_for_inputs()?;
        let a = self.store.load(ArtifactRole::A.name())?;
        let b = self.store.load(ArtifactRole::B.name())?;
        let reference = self.store.load(ArtifactRole::Reference.name())?;
        info!(
            a = %a.shape(),
            b = %b.shape(),
            dir = %self.store.root().display(),
            "inputs loaded"
        );
        self.set_inputs(a, b, reference)
    }

    /// `Idle -> InputsLoaded` from in-memory matrices.
    ///
    /// # Errors
    /// `DimensionMismatch` unless `a @ b` is defined and has the shape of
    /// `reference`.
    pub fn set_inputs(&mut self, a: Matrix, b: Matrix, reference: Matrix) -> Result<()> {
        self.expect_ready_for_inputs()?;
        let compatible = a.shape().matmul_shape(&b.shape()) == Some(reference.shape());
        if !compatible {
            return Err(BenchError::DimensionMismatch {
                a: a.shape(),
                b: b.shape(),
                c: reference.shape(),
            });
        }
        self.inputs = Some(Inputs {
            a: Arc::new(a),
            b: Arc::new(b),
            reference,
        });
        self.elapsed = None;
        self.advance(RunState::InputsLoaded);
        Ok(())
    }

    /// `InputsLoaded -> Transferred`: hand the operands to the backend.
    ///
    /// For asynchronous backends the copy is awaited here so it stays out of
    /// the timed interval.
    pub fn transfer(&mut self) -> Result<()> {
        self.expect(RunState::InputsLoaded)?;
        let inputs = self.inputs.as_ref().ok_or(BenchError::InvalidState {
            expected: RunState::InputsLoaded,
            found: self.state,
        })?;
        self.backend
            .transfer(Arc::clone(&inputs.a), Arc::clone(&inputs.b))?;
        if self.backend.is_asynchronous() {
            self.backend.synchronize()?;
        }
        self.advance(RunState::Transferred);
        Ok(())
    }

    /// `Transferred -> Timing -> Completed`: time the multiplication.
    pub fn time_multiply(&mut self) -> Result<Duration> {
        self.expect(RunState::Transferred)?;
        let asynchronous = self.backend.is_asynchronous();
        if asynchronous {
            // Flush anything still pending before the clock starts.
            if let Err(e) = self.backend.synchronize() {
                self.abort();
                return Err(e.into());
            }
        }

        self.advance(RunState::Timing);
        let mut elapsed = Duration::ZERO;
        let outcome = {
            let timer = ScopedTimer::start(&mut elapsed);
            let outcome = launch_and_wait(self.backend.as_mut(), asynchronous);
            timer.stop();
            outcome
        };
        self.elapsed = Some(elapsed);

        if let Err(e) = outcome {
            warn!(
                backend = self.backend.name(),
                elapsed_secs = elapsed.as_secs_f64(),
                error = %e,
                "multiply failed"
            );
            self.abort();
            return Err(e.into());
        }

        info!(
            backend = self.backend.name(),
            device = %self.backend.device(),
            elapsed_secs = elapsed.as_secs_f64(),
            "multiply completed"
        );
        self.advance(RunState::Completed);
        Ok(elapsed)
    }

    /// Fetch the product and verify it against the ground truth.
    pub fn finish(&mut self) -> Result<BenchmarkRun> {
        self.expect(RunState::Completed)?;
        let (Some(inputs), Some(elapsed)) = (self.inputs.take(), self.elapsed) else {
            return Err(BenchError::InvalidState {
                expected: RunState::Completed,
                found: self.state,
            });
        };
        let computed = match self.backend.fetch() {
            Ok(c) => c,
            Err(e) => {
                self.abort();
                return Err(e.into());
            }
        };
        let verdict = verify::verify(&computed, &inputs.reference, self.config.tolerance);
        debug!(?verdict, "verification finished");

        let result = BenchmarkResult {
            backend: self.backend.name().to_string(),
            device: self.backend.device(),
            elapsed,
            verdict,
            expected: self.backend.expected_agreement(),
        };
        self.advance(RunState::Idle);
        Ok(BenchmarkRun {
            result,
            a: inputs.a,
            b: inputs.b,
            reference: inputs.reference,
            computed,
        })
    }

    fn expect(&self, expected: RunState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BenchError::InvalidState {
                expected,
                found: self.state,
            })
        }
    }

    fn expect_ready_for_inputs(&self) -> Result<()> {
        match self.state {
            RunState::Idle | RunState::InputsLoaded => Ok(()),
            found => Err(BenchError::InvalidState {
                expected: RunState::Idle,
                found,
            }),
        }
    }

    /// Drop the current inputs and return to `Idle` after a failed step.
    fn abort(&mut self) {
        self.inputs = None;
        self.advance(RunState::Idle);
    }

    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "harness state");
        self.state = next;
    }
}

fn launch_and_wait(backend: &mut dyn ComputeBackend, asynchronous: bool) -> mb_tensor::Result<()> {
    backend.launch()?;
    if asynchronous {
        backend.synchronize()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_tensor::{CpuBackend, Shape, StreamBackend};

    fn harness(backend: Box<dyn ComputeBackend>) -> BenchmarkHarness {
        BenchmarkHarness::new(ArtifactStore::new("unused"), backend, HarnessConfig::default())
    }

    fn ones_identity(n: usize) -> (Matrix, Matrix, Matrix) {
        let a = Matrix::ones(Shape::square(n));
        (a.clone(), Matrix::identity(n), a)
    }

    #[test]
    fn test_state_machine() {
        let mut h = harness(Box::new(CpuBackend::new()));
        assert_eq!(h.state(), RunState::Idle);
        let (a, b, c) = ones_identity(4);
        h.set_inputs(a, b, c).unwrap();
        assert_eq!(h.state(), RunState::InputsLoaded);
        h.transfer().unwrap();
        assert_eq!(h.state(), RunState::Transferred);
        h.time_multiply().unwrap();
        assert_eq!(h.state(), RunState::Completed);
        let run = h.finish().unwrap();
        assert_eq!(h.state(), RunState::Idle);
        assert!(run.result.exact_match());
        assert!(run.result.approx_match());
        assert!(run.result.passed());
    }

    #[test]
    fn test_out_of_order_steps_rejected() {
        let mut h = harness(Box::new(CpuBackend::new()));
        assert!(matches!(h.transfer(), Err(BenchError::InvalidState { .. })));
        assert!(matches!(h.time_multiply(), Err(BenchError::InvalidState { .. })));
        assert!(matches!(h.finish(), Err(BenchError::InvalidState { .. })));
    }

    #[test]
    fn test_dimension_mismatch_before_timing() {
        let mut h = harness(Box::new(CpuBackend::new()));
        let a = Matrix::ones(Shape::new(4, 3));
        let b = Matrix::ones(Shape::new(4, 4));
        let c = Matrix::ones(Shape::new(4, 4));
        let err = h.set_inputs(a, b, c).unwrap_err();
        assert!(matches!(err, BenchError::DimensionMismatch { .. }));
        assert_eq!(h.state(), RunState::Idle);
        assert_eq!(h.last_elapsed(), None);
    }

    #[test]
    fn test_reference_shape_mismatch() {
        let mut h = harness(Box::new(CpuBackend::new()));
        let a = Matrix::ones(Shape::square(3));
        let b = Matrix::ones(Shape::square(3));
        let c = Matrix::ones(Shape::new(3, 2));
        assert!(matches!(
            h.set_inputs(a, b, c),
            Err(BenchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_async_backend_run() {
        let mut h = harness(Box::new(StreamBackend::new().unwrap()));
        let (a, b, c) = ones_identity(8);
        h.set_inputs(a, b, c).unwrap();
        h.transfer().unwrap();
        let elapsed = h.time_multiply().unwrap();
        let run = h.finish().unwrap();
        assert_eq!(run.result.elapsed, elapsed);
        assert_eq!(run.result.backend, "stream");
        assert!(run.result.exact_match());
    }

    #[test]
    fn test_harness_reusable_after_failed_fetch() {
        let mut h = harness(Box::new(CpuBackend::new()));
        let (a, b, c) = ones_identity(3);
        h.set_inputs(a.clone(), b.clone(), c.clone()).unwrap();
        h.transfer().unwrap();
        h.time_multiply().unwrap();
        // Taking the product out from under the harness makes `finish` fail.
        h.backend.fetch().unwrap();
        assert!(matches!(
            h.finish(),
            Err(BenchError::Tensor(mb_tensor::TensorError::NoResult(_)))
        ));
        assert_eq!(h.state(), RunState::Idle);

        h.set_inputs(a, b, c).unwrap();
        h.transfer().unwrap();
        h.time_multiply().unwrap();
        assert!(h.finish().unwrap().result.passed());
    }

    #[test]
    fn test_wrong_result_fails() {
        let mut h = harness(Box::new(CpuBackend::new()));
        let a = Matrix::ones(Shape::square(2));
        let b = Matrix::identity(2);
        let wrong = Matrix::zeros(Shape::square(2));
        h.set_inputs(a, b, wrong).unwrap();
        h.transfer().unwrap();
        h.time_multiply().unwrap();
        let run = h.finish().unwrap();
        assert!(!run.result.exact_match());
        assert!(!run.result.approx_match());
        assert!(!run.result.passed());
        assert_eq!(run.result.verdict.max_abs_diff, Some(1.0));
    }
}
