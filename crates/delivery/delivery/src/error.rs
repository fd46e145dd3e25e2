//! Delivery error types.

use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Error type for delivery operations.
///
/// Network failures, timeouts, and non-2xx responses are not errors: they
/// are classified outcomes inside [`TestResult`](crate::TestResult). These
/// variants cover conditions that reject a call before or outside the
/// request itself.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The target URL did not parse or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A signing secret was required but empty.
    #[error("Missing signing secret for endpoint {0}")]
    MissingSecret(String),

    /// The payload could not be serialized.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The delivery log rejected a write.
    #[error("Store error: {0}")]
    Store(#[from] hookpulse_store::StoreError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        DeliveryError::InvalidPayload(err.to_string())
    }
}

/// Redacts a signing secret from an error message before it is surfaced.
pub(crate) fn redact_secret(message: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() && message.contains(secret) => {
            message.replace(secret, "[REDACTED]")
        }
        _ => message.to_string(),
    }
}
