//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// This enum encapsulates all possible errors that can occur during
/// core operations like traversal, parsing, and artifact persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// A persisted JSON document could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Represents an error that occurred when a Tokio task was joined.
    /// This is often due to a task panicking or being cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// An ignore pattern could not be compiled.
    #[error("Invalid ignore pattern: {0}")]
    Ignore(#[from] ignore::Error),

    /// The requested artifact, preset or path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied name is not usable as an identifier.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The target of a create or rename is already taken.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The operation is not available in this build.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl CoreError {
    /// Wraps an I/O error together with the path it happened on, mapping
    /// `NotFound` to the dedicated variant.
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            CoreError::NotFound(path.display().to_string())
        } else {
            CoreError::Io(err, path)
        }
    }
}

/// Convenience alias used throughout `core`.
pub type CoreResult<T> = Result<T, CoreError>;
