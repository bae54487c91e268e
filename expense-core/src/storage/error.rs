//! Error types for the key-value persistence port.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by key-value stores and the token store built on them.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum StorageError {
    /// Reading, writing or renaming the backing file failed.
    #[error("storage io error at {path}: {error}")]
    Io {
        /// File the operation was acting on.
        path: String,
        /// Underlying error message.
        error: String,
    },

    /// The backing file exists but does not hold a valid key-value map.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// An access token write was attempted while no refresh token is stored.
    #[error("cannot store an access token without a refresh token")]
    IncompleteTokenPair,
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
