use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use mb_tensor::Matrix;

use crate::error::{Result, StoreError};
use crate::header::{MatrixHeader, ELEMENT_LEN, HEADER_LEN};

/// File extension for stored matrices.
pub const ARTIFACT_EXTENSION: &str = "mat";

/// A directory of named matrix artifacts.
///
/// Each artifact lives in `<root>/<name>.mat` and holds a [`MatrixHeader`]
/// followed by the row-major element buffer.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file an artifact name resolves to.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.{}", name, ARTIFACT_EXTENSION)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Write `matrix` under `name`, replacing any previous artifact.
    ///
    /// The data is written to a temporary sibling file and renamed into
    /// place, so a concurrent reader never observes a partial artifact.
    pub fn save(&self, name: &str, matrix: &Matrix) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)?;
        let tmp = self.root.join(format!(".{}.{}.tmp", name, ARTIFACT_EXTENSION));

        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        MatrixHeader::for_shape(matrix.shape()).write(&mut writer)?;
        for v in matrix.data() {
            writer.write_all(&v.to_le_bytes())?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        debug!(name, shape = %matrix.shape(), path = %path.display(), "artifact saved");
        Ok(path)
    }

    /// Read the artifact stored under `name`.
    ///
    /// # Errors
    /// - `ArtifactNotFound` if no file exists for `name`
    /// - `CorruptArtifact` if the header is invalid or the payload length
    ///   disagrees with the declared dimensions
    pub fn load(&self, name: &str) -> Result<Matrix> {
        let path = self.path_for(name)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ArtifactNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| StoreError::CorruptArtifact {
            name: name.to_string(),
            reason,
        };

        let file_len = file.metadata()?.len();
        if file_len < HEADER_LEN as u64 {
            return Err(corrupt(format!(
                "file is {} bytes, shorter than the {}-byte header",
                file_len, HEADER_LEN
            )));
        }

        // Memory-map the entire file.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = MatrixHeader::parse(&mut &mmap[..HEADER_LEN], name)?;
        let (shape, expected) = match (header.shape(), header.payload_len()) {
            (Some(shape), Some(len)) => (shape, len),
            _ => {
                return Err(corrupt(format!(
                    "declared dimensions {}x{} overflow",
                    header.rows, header.cols
                )))
            }
        };

        let payload = &mmap[HEADER_LEN..];
        if payload.len() != expected {
            return Err(corrupt(format!(
                "header declares {}x{} ({} elements) but payload holds {} bytes ({} elements)",
                header.rows,
                header.cols,
                shape.numel(),
                payload.len(),
                payload.len() as f64 / ELEMENT_LEN as f64
            )));
        }

        let data: Vec<f64> = payload
            .chunks_exact(ELEMENT_LEN)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();

        debug!(name, %shape, path = %path.display(), "artifact loaded");
        Ok(Matrix::new(data, shape)?)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        Err(StoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
