use thiserror::Error;

use crate::gate::PinValidationError;
use crate::storage::StorageError;

/// Error outputs from `GoldKit`
#[derive(Debug, Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum GoldKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// Name of the offending input.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Local PIN validation failed. Never reaches the network.
    #[error(transparent)]
    Validation(#[from] PinValidationError),
    /// The server rejected the PIN (or OTP). Counts toward lockout.
    #[error("pin_rejected: {message}")]
    PinRejected {
        /// Server provided reason, if any.
        message: String,
    },
    /// The server reports that no PIN has been provisioned for this account.
    #[error("pin_not_found")]
    PinNotFound,
    /// Network connection error with details
    #[error("network_error: url={url}, status={status:?}, error={error}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Transport or server error description.
        error: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Error details.
        error: String,
    },
    /// A response was missing a required field or had it with the wrong type.
    #[error("malformed_response: {endpoint} is missing `{field}`")]
    MalformedResponse {
        /// Endpoint that produced the response.
        endpoint: String,
        /// Path of the required field, e.g. `user.phone`.
        field: String,
    },
    /// Local storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Catch-all for unexpected conditions
    #[error("generic_error: {error}")]
    Generic {
        /// Error details.
        error: String,
    },
}

impl GoldKitError {
    /// Whether the failure happened before the server could answer (connect
    /// errors, timeouts, 5xx after retries).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError { .. })
    }
}

impl From<serde_json::Error> for GoldKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for GoldKitError {
    fn from(error: reqwest::Error) -> Self {
        Self::NetworkError {
            url: error
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: error.status().map(|s| s.as_u16()),
            error: error.to_string(),
        }
    }
}
