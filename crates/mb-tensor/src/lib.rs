//! `mb-tensor` - Dense matrices with pluggable compute backends for matbench.
//!
//! This crate provides:
//! - A row-major f64 `Matrix` type and its `Shape`
//! - A `ComputeBackend` trait exposing transfer, launch and synchronize steps
//! - The reference `CpuBackend` that defines ground truth
//! - A `StreamBackend` that executes asynchronously on a host work queue
//! - A `CudaBackend` behind the `cuda` feature
//! - Device probing with silent fallback to the host

pub mod backend;
pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod device;
pub mod error;
pub mod matrix;
pub mod shape;
pub mod stream;

// Re-export primary types at the crate root for convenience.
pub use backend::{Agreement, ComputeBackend, Execution};
pub use cpu::CpuBackend;
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use device::{accelerated_backend, probe_device, reference_backend, Device, DevicePreference};
pub use error::{Result, TensorError};
pub use matrix::Matrix;
pub use shape::Shape;
pub use stream::StreamBackend;
