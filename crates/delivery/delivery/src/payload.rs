//! Delivery payloads, call options, and classified outcomes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hookpulse_store::DeliveryStatus;

/// Structured payload posted to a webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPayload {
    /// Event type (e.g., "order.created").
    pub event_type: String,
    /// Endpoint the payload is addressed to.
    pub webhook_id: String,
    /// When the payload was produced.
    pub timestamp: DateTime<Utc>,
    /// Owning organization, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Acting user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Event data.
    pub data: Value,
}

impl DeliveryPayload {
    /// Creates a new payload.
    pub fn new(
        event_type: impl Into<String>,
        webhook_id: impl Into<String>,
        data: impl Serialize,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            webhook_id: webhook_id.into(),
            timestamp: Utc::now(),
            organization_id: None,
            user_id: None,
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// Sets the owning organization.
    pub fn with_organization(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    /// Sets the acting user.
    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    /// Sets the payload timestamp.
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }
}

/// Options for a single delivery or test call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Hard deadline for the whole request in milliseconds.
    pub timeout_ms: u64,
    /// Whether to follow HTTP redirects.
    pub follow_redirects: bool,
    /// Retries after the initial attempt.
    pub retry_attempts: u32,
    /// Marks the call as a test (`X-Test: true`).
    pub test: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            follow_redirects: true,
            retry_attempts: 0,
            test: false,
        }
    }
}

impl CallOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request deadline.
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Sets whether redirects are followed.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Sets the retry budget.
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Marks the call as a test call.
    pub fn as_test(mut self) -> Self {
        self.test = true;
        self
    }
}

/// Captured response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResponseBody {
    /// Body parsed as JSON (content-type indicated JSON).
    Json(Value),
    /// Body captured as text.
    Text(String),
    /// Body could not be decoded.
    Unparsable,
}

impl ResponseBody {
    /// Returns true when the body could not be decoded.
    pub fn is_unparsable(&self) -> bool {
        matches!(self, ResponseBody::Unparsable)
    }
}

/// Classified outcome of one delivery or test call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Attempt outcome.
    pub status: DeliveryStatus,
    /// HTTP status code (if a response was received).
    pub status_code: Option<u16>,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
    /// Captured response body.
    pub response_body: Option<ResponseBody>,
    /// Error message (if failed or timed out).
    pub error_message: Option<String>,
    /// Headers sent with the request.
    pub request_headers: HashMap<String, String>,
    /// Headers received with the response.
    pub response_headers: Option<HashMap<String, String>>,
    /// Serialized payload size in bytes.
    pub payload_size: u64,
}

impl TestResult {
    /// Returns true for 2xx outcomes.
    pub fn succeeded(&self) -> bool {
        self.status == DeliveryStatus::Success
    }

    /// Whether the outcome is eligible for retry on the test path.
    ///
    /// Timeouts and connection-level failures are retryable; a completed
    /// non-2xx response is a final answer from the endpoint.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            DeliveryStatus::Timeout => true,
            DeliveryStatus::Failed => self.status_code.is_none(),
            DeliveryStatus::Success => false,
        }
    }
}
