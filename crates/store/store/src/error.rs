//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A requested record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),
}
