use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
    #[error("corrupt artifact '{name}': {reason}")]
    CorruptArtifact { name: String, reason: String },
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),
    #[error("tensor error: {0}")]
    TensorError(#[from] mb_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
