//! Monitor error types.

use thiserror::Error;

/// Result type for monitoring operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Error type for monitoring operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The delivery log could not be read.
    ///
    /// Propagated as a fatal failure for the computation: substituting
    /// zeroed stats would misreport an endpoint as healthy.
    #[error("Store error: {0}")]
    Store(#[from] hookpulse_store::StoreError),

    /// The endpoint is not tracked by the aggregator.
    #[error("Endpoint not tracked: {0}")]
    NotTracked(String),

    /// A subscriber rejected a notification.
    #[error("Subscriber error: {0}")]
    Subscriber(String),
}
