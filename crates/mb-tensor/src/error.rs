use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("matmul dimension mismatch: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("no operands transferred to backend '{0}'")]
    NotTransferred(String),
    #[error("no result available on backend '{0}'")]
    NoResult(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
