//! Vector store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during vector store operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Vector length differs from the store dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Snapshot file unreadable as the expected format
    #[error("Corrupt snapshot {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Journal frames out of sequence
    #[error("Corrupt journal {path:?}: {reason}")]
    Journal { path: PathBuf, reason: String },

    /// Vector count and metadata count disagree after recovery
    #[error("Store misaligned: {vectors} vectors, {records} metadata records")]
    Misaligned { vectors: usize, records: usize },

    /// Another process holds the store lock
    #[error("Store at {0:?} is locked by another process")]
    Locked(PathBuf),

    /// Path cannot be stored
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path already has a record
    #[error("Duplicate path: {0}")]
    DuplicatePath(String),

    /// Position was not the next unused one
    #[error("Out-of-sequence position: expected {expected}, got {actual}")]
    OutOfSequence { expected: u64, actual: u64 },

    /// Position already holds a record
    #[error("Position {0} already has a record")]
    PositionTaken(u64),

    /// A lock guarding in-memory state was poisoned
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] memory_embeddings::EmbeddingError),
}

impl VectorError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        VectorError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
