//! Error types for stevedore-core

use thiserror::Error;

/// Sandbox error type
#[derive(Debug, Error)]
pub enum Error {
    /// The container runtime rejected or failed an operation
    #[error("{operation} failed: {message}")]
    Runtime {
        /// Runtime operation that failed (e.g. "create_container")
        operation: &'static str,
        /// Message reported by the runtime
        message: String,
    },

    /// Container or exec session does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Deadline exceeded (milliseconds)
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Output stream broke while being read
    #[error("stream error: {0}")]
    Stream(String),

    /// Could not reach the runtime
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Runtime`] failure
    pub fn runtime(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Runtime {
            operation,
            message: message.into(),
        }
    }

    /// Whether the runtime reported the target as missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
