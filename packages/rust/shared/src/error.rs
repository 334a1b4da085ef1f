//! Error types for TopicForge.
//!
//! Library crates use [`TopicforgeError`] via `thiserror`.
//! The app crate (cli) wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all TopicForge operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicforgeError {
    /// Configuration loading or validation error. Fatal for the stage that
    /// raised it (e.g. training with fewer than two label classes).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during resolution or extraction. Non-fatal:
    /// the affected unit is skipped for the current run.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error. Non-fatal per unit.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Artifact store error (malformed batch file, slot write failure).
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty result set, mismatched model pairing).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicforgeError>;

impl TopicforgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
