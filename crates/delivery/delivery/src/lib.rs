//! # Hookpulse Delivery
//!
//! Outbound webhook delivery for Hookpulse providing:
//! - HMAC-SHA256 payload signing
//! - Single signed HTTP delivery attempts with hard deadlines
//! - Bounded retries with exponential backoff
//! - Batch execution with bounded parallelism
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookpulse_delivery::{CallOptions, DeliveryPayload, RetryCoordinator, WebhookCaller};
//!
//! let caller = WebhookCaller::new();
//! let coordinator = RetryCoordinator::new(caller);
//!
//! let payload = DeliveryPayload::new("order.created", "wh-1", serde_json::json!({"order": 42}));
//! let options = CallOptions::new().timeout_ms(10_000).retry_attempts(2);
//!
//! let result = coordinator
//!     .call("https://example.com/hooks", Some("whsec_123"), &payload, &options)
//!     .await?;
//! ```

mod batch;
mod caller;
mod error;
mod payload;
mod retry;
mod runner;
mod signature;

pub use batch::{BatchItem, BatchOutcome, DEFAULT_BATCH_WIDTH};
pub use caller::WebhookCaller;
pub use error::{DeliveryError, DeliveryResult};
pub use payload::{CallOptions, DeliveryPayload, ResponseBody, TestResult};
pub use retry::{
    retry_with_backoff, CallReport, ExponentialBackoff, RetryCoordinator, RetryPolicy,
    RetryStrategy,
};
pub use runner::DeliveryRunner;
pub use signature::{PayloadSigner, SIGNATURE_VERSION};
