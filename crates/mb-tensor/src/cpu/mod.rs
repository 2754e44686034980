pub mod matmul;

use std::sync::Arc;

use crate::backend::{check_operands, Agreement, ComputeBackend, Execution};
use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::matrix::Matrix;

/// Pure-Rust reference CPU backend.
///
/// A single-threaded, deterministic loop optimized for correctness rather
/// than peak performance. Its output defines the ground truth every other
/// backend is verified against.
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    operands: Option<(Arc<Matrix>, Arc<Matrix>)>,
    output: Option<Matrix>,
}

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend::default()
    }

    /// Computes `a @ b` directly, without staging the operands.
    pub fn matmul(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let shape = check_operands(a, b)?;
        let mut c = vec![0.0f64; shape.numel()];
        matmul::matmul_into(a.data(), b.data(), a.cols(), b.cols(), &mut c);
        Matrix::new(c, shape)
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn execution(&self) -> Execution {
        Execution::Synchronous
    }

    fn expected_agreement(&self) -> Agreement {
        Agreement::Exact
    }

    fn transfer(&mut self, a: Arc<Matrix>, b: Arc<Matrix>) -> Result<()> {
        check_operands(&a, &b)?;
        self.output = None;
        self.operands = Some((a, b));
        Ok(())
    }

    fn launch(&mut self) -> Result<()> {
        let (a, b) = self
            .operands
            .as_ref()
            .ok_or_else(|| TensorError::NotTransferred(self.name().to_string()))?;
        self.output = Some(self.matmul(a, b)?);
        Ok(())
    }

    fn synchronize(&mut self) -> Result<()> {
        Ok(())
    }

    fn fetch(&mut self) -> Result<Matrix> {
        self.output
            .take()
            .ok_or_else(|| TensorError::NoResult(self.name().to_string()))
    }

    fn multiply(&mut self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.matmul(a, b)
    }
}
