//! CUDA backend using cudarc 0.17.
//!
//! Operands are copied to device memory in `transfer`; `launch` only enqueues
//! the kernel on the context's default stream, so timing requires an explicit
//! `synchronize`.

use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;
use tracing::{debug, info};

use crate::backend::{check_operands, Agreement, ComputeBackend, Execution};
use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::matrix::Matrix;
use crate::shape::Shape;

const BLOCK_SIZE: u32 = 16;

struct DeviceOperands {
    a: CudaSlice<f64>,
    b: CudaSlice<f64>,
    m: usize,
    k: usize,
    n: usize,
}

pub struct CudaBackend {
    ordinal: usize,
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    _module: Arc<CudaModule>,
    function: CudaFunction,
    operands: Option<DeviceOperands>,
    output: Option<(CudaSlice<f64>, Shape)>,
}

impl std::fmt::Debug for CudaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaBackend")
            .field("ordinal", &self.ordinal)
            .field("transferred", &self.operands.is_some())
            .finish()
    }
}

fn device_err(what: &str, e: impl std::fmt::Debug) -> TensorError {
    TensorError::Device(format!("{}: {:?}", what, e))
}

impl CudaBackend {
    /// Open device `ordinal` and compile the matmul kernel.
    ///
    /// # Errors
    /// `DeviceUnavailable` if the driver or NVRTC library cannot be loaded,
    /// or the device cannot be opened.
    pub fn new(ordinal: usize) -> Result<Self> {
        if !cuda_libraries_present() {
            return Err(TensorError::DeviceUnavailable(
                "CUDA driver or NVRTC library not found".to_string(),
            ));
        }
        let ctx = CudaContext::new(ordinal).map_err(|e| {
            TensorError::DeviceUnavailable(format!("cuda:{}: {:?}", ordinal, e))
        })?;
        let stream = ctx.default_stream();

        let ptx = compile_ptx(include_str!("matmul_f64.cu"))
            .map_err(|e| device_err("failed to compile PTX", e))?;
        let module = ctx
            .load_module(ptx)
            .map_err(|e| device_err("failed to load CUDA module", e))?;
        let function = module
            .load_function("matmul_f64")
            .map_err(|e| device_err("failed to load matmul function", e))?;

        info!(ordinal, "CUDA backend initialized");
        Ok(CudaBackend {
            ordinal,
            _ctx: ctx,
            stream,
            _module: module,
            function,
            operands: None,
            output: None,
        })
    }
}

fn as_i32(v: usize) -> Result<i32> {
    i32::try_from(v).map_err(|_| TensorError::Device(format!("dimension {} exceeds i32", v)))
}

/// Kernel arguments for `[m, k] @ [k, n]`.
///
/// Each dimension is passed as `int`; element offsets are computed as
/// `size_t` on the device, so only the buffer lengths need to fit `usize`.
fn kernel_dims(m: usize, k: usize, n: usize) -> Result<(i32, i32, i32)> {
    for (lhs, rhs) in [(m, k), (k, n), (m, n)] {
        if lhs.checked_mul(rhs).is_none() {
            return Err(TensorError::Device(format!(
                "buffer of {}x{} elements overflows usize",
                lhs, rhs
            )));
        }
    }
    Ok((as_i32(m)?, as_i32(k)?, as_i32(n)?))
}

impl ComputeBackend for CudaBackend {
    fn name(&self) -> &str {
        "cuda"
    }

    fn device(&self) -> Device {
        Device::Cuda {
            ordinal: self.ordinal,
        }
    }

    fn execution(&self) -> Execution {
        Execution::Asynchronous
    }

    fn expected_agreement(&self) -> Agreement {
        Agreement::Approximate
    }

    fn transfer(&mut self, a: Arc<Matrix>, b: Arc<Matrix>) -> Result<()> {
        check_operands(&a, &b)?;
        self.output = None;
        let a_dev = self
            .stream
            .memcpy_stod(a.data())
            .map_err(|e| device_err("failed to transfer A to device", e))?;
        let b_dev = self
            .stream
            .memcpy_stod(b.data())
            .map_err(|e| device_err("failed to transfer B to device", e))?;
        debug!(bytes = (a.data().len() + b.data().len()) * 8, "operands transferred");
        self.operands = Some(DeviceOperands {
            a: a_dev,
            b: b_dev,
            m: a.rows(),
            k: a.cols(),
            n: b.cols(),
        });
        Ok(())
    }

    fn launch(&mut self) -> Result<()> {
        let ops = self
            .operands
            .as_ref()
            .ok_or_else(|| TensorError::NotTransferred("cuda".to_string()))?;
        let (m, k, n) = (ops.m, ops.k, ops.n);
        let (m_arg, k_arg, n_arg) = kernel_dims(m, k, n)?;
        let mut c_dev: CudaSlice<f64> = self
            .stream
            .alloc_zeros(m * n)
            .map_err(|e| device_err("failed to allocate C on device", e))?;

        if m > 0 && n > 0 {
            let cfg = LaunchConfig {
                grid_dim: ((n as u32).div_ceil(BLOCK_SIZE), (m as u32).div_ceil(BLOCK_SIZE), 1),
                block_dim: (BLOCK_SIZE, BLOCK_SIZE, 1),
                shared_mem_bytes: 0,
            };
            let mut builder = self.stream.launch_builder(&self.function);
            builder.arg(&ops.a);
            builder.arg(&ops.b);
            builder.arg(&mut c_dev);
            builder.arg(&m_arg);
            builder.arg(&k_arg);
            builder.arg(&n_arg);
            unsafe { builder.launch(cfg) }.map_err(|e| device_err("failed to launch kernel", e))?;
        }

        self.output = Some((c_dev, Shape::new(m, n)));
        Ok(())
    }

    fn synchronize(&mut self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| device_err("stream synchronize failed", e))
    }

    fn fetch(&mut self) -> Result<Matrix> {
        let (c_dev, shape) = self
            .output
            .take()
            .ok_or_else(|| TensorError::NoResult("cuda".to_string()))?;
        let host: Vec<f64> = self
            .stream
            .memcpy_dtov(&c_dev)
            .map_err(|e| device_err("failed to transfer result back", e))?;
        Matrix::new(host, shape)
    }
}

/// True if the CUDA driver and NVRTC shared libraries can be loaded.
///
/// With dynamic loading, cudarc panics on first use of a missing library,
/// so this must be checked before any driver call.
pub fn cuda_libraries_present() -> bool {
    // SAFETY: both calls only try to open the shared libraries.
    unsafe { cudarc::driver::sys::is_culib_present() && cudarc::nvrtc::sys::is_culib_present() }
}

/// Check if a CUDA device can be opened.
pub fn is_cuda_available() -> bool {
    cuda_libraries_present() && CudaContext::new(0).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;

    #[test]
    fn test_kernel_dims() {
        assert_eq!(kernel_dims(4, 5, 6).unwrap(), (4, 5, 6));
        // 46341^2 exceeds i32 but is a valid element offset
        assert_eq!(kernel_dims(46341, 46341, 46341).unwrap(), (46341, 46341, 46341));
        assert!(kernel_dims(1, i32::MAX as usize + 1, 1).is_err());
        assert!(kernel_dims(usize::MAX, 2, 1).is_err());
    }

    #[test]
    fn test_missing_libraries_are_unavailable() {
        if cuda_libraries_present() {
            return;
        }
        assert!(!is_cuda_available());
        assert!(matches!(
            CudaBackend::new(0),
            Err(TensorError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_cuda_matches_reference_within_tolerance() {
        let Ok(mut backend) = CudaBackend::new(0) else {
            return;
        };
        let a = Matrix::new((0..64).map(|v| v as f64 / 64.0).collect(), Shape::square(8)).unwrap();
        let b = Matrix::identity(8);
        let got = backend.multiply(&a, &b).unwrap();
        let expected = CpuBackend::new().matmul(&a, &b).unwrap();
        for (x, y) in got.data().iter().zip(expected.data()) {
            assert!((x - y).abs() <= 1e-8 + 1e-5 * y.abs());
        }
    }
}
