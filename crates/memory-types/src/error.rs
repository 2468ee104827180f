//! Error types shared across the semantic memory workspace.

use thiserror::Error;

/// Unified error type for configuration and input handling.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A setting has an unusable value
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}
