use std::io::{self, Read, Write};

use mb_tensor::Shape;

use crate::error::{Result, StoreError};

/// The four-byte magic number identifying a matrix artifact: ASCII "MBMX".
pub const MATRIX_MAGIC: [u8; 4] = *b"MBMX";

/// Current artifact format version.
pub const MATRIX_VERSION: u32 = 1;

/// Size in bytes of the fixed header: magic, version, rows, cols.
pub const HEADER_LEN: usize = 4 + 4 + 8 + 8;

/// Size in bytes of one stored element.
pub const ELEMENT_LEN: usize = std::mem::size_of::<f64>();

/// Parsed artifact header.
///
/// All integers are little-endian. The header is followed by `rows * cols`
/// little-endian f64 values in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixHeader {
    pub rows: u64,
    pub cols: u64,
}

impl MatrixHeader {
    pub fn for_shape(shape: Shape) -> Self {
        MatrixHeader {
            rows: shape.rows() as u64,
            cols: shape.cols() as u64,
        }
    }

    /// Parse a header from the beginning of a reader.
    ///
    /// Validates the magic and version; `name` is only used for errors.
    pub fn parse(reader: &mut impl Read, name: &str) -> Result<MatrixHeader> {
        let corrupt = |reason: String| StoreError::CorruptArtifact {
            name: name.to_string(),
            reason,
        };
        let truncated = |e: io::Error| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                corrupt("truncated header".to_string())
            } else {
                StoreError::Io(e)
            }
        };

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if magic != MATRIX_MAGIC {
            return Err(corrupt(format!("invalid magic {:?}", magic)));
        }

        let mut buf4 = [0u8; 4];
        reader.read_exact(&mut buf4).map_err(truncated)?;
        let version = u32::from_le_bytes(buf4);
        if version != MATRIX_VERSION {
            return Err(corrupt(format!("unsupported format version {}", version)));
        }

        let mut buf8 = [0u8; 8];
        reader.read_exact(&mut buf8).map_err(truncated)?;
        let rows = u64::from_le_bytes(buf8);

        reader.read_exact(&mut buf8).map_err(truncated)?;
        let cols = u64::from_le_bytes(buf8);

        Ok(MatrixHeader { rows, cols })
    }

    pub fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&MATRIX_MAGIC)?;
        writer.write_all(&MATRIX_VERSION.to_le_bytes())?;
        writer.write_all(&self.rows.to_le_bytes())?;
        writer.write_all(&self.cols.to_le_bytes())
    }

    /// The declared shape, or `None` if it does not fit in memory on this
    /// platform.
    pub fn shape(&self) -> Option<Shape> {
        let rows = usize::try_from(self.rows).ok()?;
        let cols = usize::try_from(self.cols).ok()?;
        let shape = Shape::new(rows, cols);
        shape.checked_numel()?.checked_mul(ELEMENT_LEN)?;
        Some(shape)
    }

    /// Expected payload size in bytes, or `None` on overflow.
    pub fn payload_len(&self) -> Option<usize> {
        self.shape()
            .and_then(|s| s.checked_numel())
            .and_then(|n| n.checked_mul(ELEMENT_LEN))
    }
}
