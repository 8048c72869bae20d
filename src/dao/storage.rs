//! Storage errors shared by every backend.

use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
///
/// Every variant is treated as transient by the round engine: the failure is
/// surfaced to the caller and never retried internally.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the call.
    #[error("storage unavailable during `{operation}`: {message}")]
    Unavailable {
        /// Gateway call that failed.
        operation: &'static str,
        /// Rendered backend error.
        message: String,
        /// Backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            operation,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Name of the gateway call that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            StorageError::Unavailable { operation, .. } => operation,
        }
    }
}
