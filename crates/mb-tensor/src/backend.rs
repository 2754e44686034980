use std::fmt::Debug;
use std::sync::Arc;

use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::matrix::Matrix;
use crate::shape::Shape;

/// How a backend's `launch` relates to the completion of the work it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// `launch` returns once the product has been computed.
    Synchronous,
    /// `launch` may return as soon as the work is enqueued; completion is
    /// only guaranteed after `synchronize`.
    Asynchronous,
}

/// How closely a backend's results are expected to match the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agreement {
    /// Bit-identical arithmetic and accumulation order.
    Exact,
    /// Equal within floating-point tolerance.
    Approximate,
}

/// Trait for pluggable matrix multiplication backends (reference CPU,
/// host stream, CUDA).
///
/// The transfer, launch and synchronize steps are exposed separately so a
/// caller can control exactly which of them fall inside a timed interval.
/// `multiply` composes them into the plain `C = A @ B` contract.
pub trait ComputeBackend: Send + Debug {
    /// Returns the name of this backend (e.g., "reference", "stream", "cuda").
    fn name(&self) -> &str;

    /// The device this backend executes on.
    fn device(&self) -> Device;

    fn execution(&self) -> Execution;

    fn expected_agreement(&self) -> Agreement;

    /// Move `a` and `b` into backend-owned form, replacing any operands and
    /// result from a previous run.
    ///
    /// # Errors
    /// Returns `MatmulMismatch` if `a.cols() != b.rows()`.
    fn transfer(&mut self, a: Arc<Matrix>, b: Arc<Matrix>) -> Result<()>;

    /// Issue the multiplication of the transferred operands.
    fn launch(&mut self) -> Result<()>;

    /// Block until all previously issued work has completed.
    fn synchronize(&mut self) -> Result<()>;

    /// Copy the product back into a host matrix, waiting for it if needed.
    fn fetch(&mut self) -> Result<Matrix>;

    fn is_asynchronous(&self) -> bool {
        self.execution() == Execution::Asynchronous
    }

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: shape [m, k]
    /// - `b`: shape [k, n]
    /// - Returns: shape [m, n]
    fn multiply(&mut self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        check_operands(a, b)?;
        self.transfer(Arc::new(a.clone()), Arc::new(b.clone()))?;
        self.launch()?;
        self.synchronize()?;
        self.fetch()
    }
}

/// Validates that `a @ b` is defined and returns the product shape.
pub fn check_operands(a: &Matrix, b: &Matrix) -> Result<Shape> {
    a.shape()
        .matmul_shape(&b.shape())
        .ok_or(TensorError::MatmulMismatch {
            m: a.rows(),
            k: a.cols(),
            k2: b.rows(),
            n: b.cols(),
        })
}
