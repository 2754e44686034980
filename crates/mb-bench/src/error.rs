use mb_tensor::Shape;
use thiserror::Error;

use crate::harness::RunState;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("store error: {0}")]
    Store(#[from] mb_store::StoreError),
    #[error("tensor error: {0}")]
    Tensor(#[from] mb_tensor::TensorError),
    #[error("dimension mismatch: A {a} @ B {b} does not produce C_reference {c}")]
    DimensionMismatch { a: Shape, b: Shape, c: Shape },
    #[error("invalid configuration {key}={value:?}: {reason}")]
    Config {
        key: String,
        value: String,
        reason: String,
    },
    #[error("harness is {found:?}, expected {expected:?}")]
    InvalidState { expected: RunState, found: RunState },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
