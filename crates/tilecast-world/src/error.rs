//! Error types for world input.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading world input.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Reading a file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A snapshot could not be parsed.
    #[error("invalid world snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A classification table could not be parsed.
    #[error("invalid tile classification: {0}")]
    Classification(#[from] toml::de::Error),
}

/// Result type for world input operations.
pub type Result<T> = std::result::Result<T, WorldError>;
