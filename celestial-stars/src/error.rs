//! Error type for catalog access.
//!
//! Open-time failures (missing file, bad header, unsupported record format)
//! are reported through [`CatalogError`]. A multi-level catalog treats any of
//! these as "disable this layer" rather than a fatal condition, so the
//! remaining layers keep working with reduced magnitude coverage.
//!
//! Record decoding has no error path: record slices are bounds-checked once
//! when the zone index is built, and every bit pattern decodes to some
//! position and magnitude.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to open catalog file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt catalog header: magic 0x{magic:08x} is neither native nor byte-swapped")]
    CorruptHeader { magic: u32 },

    #[error("Invalid catalog header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported record format: variant id {variant}")]
    UnsupportedFormat { variant: u32 },

    #[error("Unsupported mesh depth {depth} (maximum {max})")]
    UnsupportedDepth { depth: u32, max: u32 },

    #[error("Catalog declares an empty zone index")]
    ZeroIndexSize,

    #[error("Catalog truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("Catalog depth {catalog} exceeds mesh depth {mesh}")]
    DepthMismatch { catalog: u32, mesh: u32 },

    #[error("Zone {zone} out of range (catalog has {zones} zones)")]
    ZoneOutOfRange { zone: usize, zones: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` for failures caused by the environment (missing or
    /// unreadable files) rather than by the file contents.
    ///
    /// Deployments routinely omit the deepest layers, so these are expected
    /// and logged at a lower severity than format errors.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Io(_))
    }
}
