//! Ingestion error types.

use std::path::PathBuf;

use thiserror::Error;

use memory_vector::VectorError;

/// Errors from a single ingestion item.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File content is not text
    #[error("Binary or non UTF-8 content: {0:?}")]
    Binary(PathBuf),

    /// Path is missing or not a regular file
    #[error("Not a regular file: {0:?}")]
    NotAFile(PathBuf),

    /// Reading the file failed
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Event line could not be parsed
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    /// Store rejected the insert
    #[error("Store error: {0}")]
    Store(#[from] VectorError),
}
