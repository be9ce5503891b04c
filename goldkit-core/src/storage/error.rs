//! Error types for the key-value storage seam.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a [`KeyValueStore`](super::KeyValueStore) implementation.
#[derive(Debug, Error, uniffi::Error)]
pub enum StorageError {
    /// The platform store failed to read.
    #[error("storage read error: {0}")]
    Read(String),

    /// The platform store failed to write or delete.
    #[error("storage write error: {0}")]
    Write(String),

    /// A stored value could not be decoded.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for StorageError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}
