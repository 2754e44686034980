//! Accelerator-style backend that runs on the host.
//!
//! Work is issued onto a [`HostStream`] and `launch` returns immediately, so
//! callers have to use the same barrier discipline as with a real device.
//! Output rows are computed in parallel with rayon.

pub mod queue;

use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use tracing::debug;

use crate::backend::{check_operands, Agreement, ComputeBackend, Execution};
use crate::cpu::matmul::matmul_row;
use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::matrix::Matrix;
use crate::shape::Shape;

pub use queue::HostStream;

type Slot = Arc<Mutex<Option<Result<Matrix>>>>;

/// Host-side asynchronous backend.
///
/// Rows are accumulated with the same kernel as the reference backend, so
/// results are bit-identical to it.
#[derive(Debug)]
pub struct StreamBackend {
    stream: HostStream,
    operands: Option<(Arc<Matrix>, Arc<Matrix>)>,
    output: Slot,
}

impl StreamBackend {
    pub fn new() -> Result<Self> {
        Ok(StreamBackend {
            stream: HostStream::new("mb-host-stream")?,
            operands: None,
            output: Arc::new(Mutex::new(None)),
        })
    }
}

/// Computes `a @ b` with one rayon task per output row.
pub fn parallel_matmul(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let shape: Shape = check_operands(a, b)?;
    let (k, n) = (a.cols(), b.cols());
    let mut c = vec![0.0f64; shape.numel()];
    if n > 0 && k > 0 {
        c.par_chunks_mut(n)
            .zip(a.data().par_chunks(k))
            .for_each(|(c_row, a_row)| matmul_row(a_row, b.data(), n, c_row));
    }
    Matrix::new(c, shape)
}

impl ComputeBackend for StreamBackend {
    fn name(&self) -> &str {
        "stream"
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn execution(&self) -> Execution {
        Execution::Asynchronous
    }

    fn expected_agreement(&self) -> Agreement {
        Agreement::Exact
    }

    fn transfer(&mut self, a: Arc<Matrix>, b: Arc<Matrix>) -> Result<()> {
        check_operands(&a, &b)?;
        // Work from an earlier run must not land in the fresh slot.
        self.stream.synchronize()?;
        self.output = Arc::new(Mutex::new(None));
        self.operands = Some((a, b));
        Ok(())
    }

    fn launch(&mut self) -> Result<()> {
        let (a, b) = self
            .operands
            .clone()
            .ok_or_else(|| TensorError::NotTransferred(self.name().to_string()))?;
        let slot = Arc::clone(&self.output);
        debug!(stream = self.stream.name(), rows = a.rows(), "enqueue matmul");
        self.stream.enqueue(move || {
            let product = parallel_matmul(&a, &b);
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(product);
        })
    }

    fn synchronize(&mut self) -> Result<()> {
        self.stream.synchronize()
    }

    fn fetch(&mut self) -> Result<Matrix> {
        self.stream.synchronize()?;
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| TensorError::NoResult(self.name().to_string()))?
    }
}
