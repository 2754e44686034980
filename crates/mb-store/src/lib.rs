pub mod artifact;
pub mod error;
pub mod header;
pub mod store;

pub use artifact::ArtifactRole;
pub use error::{Result, StoreError};
pub use header::{MatrixHeader, HEADER_LEN, MATRIX_MAGIC, MATRIX_VERSION};
pub use store::ArtifactStore;
