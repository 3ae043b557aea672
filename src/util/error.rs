//! Error types for the voxtrace library.

use thiserror::Error;

/// Main error type for voxtrace operations.
///
/// Only persistence and configuration loading can fail. Grid edits outside the
/// domain, degenerate rays and diverging ray marches are not errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot blob is truncated, has a bad header or a corrupt body
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Snapshot arrays do not hold one entry per grid cell
    #[error("Snapshot shape mismatch: expected {expected} cells, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Snapshot was taken from a grid with a different resolution
    #[error("Snapshot resolution {actual} does not match grid resolution {expected}")]
    ResolutionMismatch { expected: u32, actual: u32 },

    /// Material id outside the known set
    #[error("Unknown material id {id} at cell {cell}")]
    UnknownMaterial { id: u8, cell: usize },

    /// Scene configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid snapshot error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }
}

/// Result type alias for voxtrace operations.
pub type Result<T> = std::result::Result<T, Error>;
