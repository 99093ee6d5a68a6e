//! Error types for id parsing.

use thiserror::Error;

/// Errors that can occur when reading data back out of an id.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    /// The payload after the separator is not a valid encoded ULID.
    #[error("malformed id")]
    Malformed,
}

impl IdError {
    /// Returns true if this error indicates a malformed id.
    pub fn is_malformed(&self) -> bool {
        matches!(self, IdError::Malformed)
    }
}

/// Result alias for id operations.
pub type Result<T, E = IdError> = std::result::Result<T, E>;
