//! Delivery event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The endpoint acknowledged the delivery with a 2xx response.
    Success,
    /// The delivery completed with a non-2xx response or a network failure.
    Failed,
    /// The delivery did not complete before the deadline.
    Timeout,
}

impl DeliveryStatus {
    /// Returns true for successful deliveries.
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryStatus::Success)
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Success => write!(f, "success"),
            DeliveryStatus::Failed => write!(f, "failed"),
            DeliveryStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// One recorded delivery attempt.
///
/// Events are append-only: once written to a [`LogStore`](crate::LogStore)
/// they are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    /// Unique identifier.
    pub id: String,
    /// Endpoint the payload was delivered to.
    pub webhook_id: String,
    /// Event type carried by the payload (e.g., "order.created").
    pub event_type: String,
    /// Attempt outcome.
    pub status: DeliveryStatus,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
    /// When the attempt was made.
    pub triggered_at: DateTime<Utc>,
    /// Error message (if failed or timed out).
    pub error_message: Option<String>,
    /// How many retries preceded this attempt.
    pub retry_count: u32,
    /// Serialized payload size in bytes.
    pub payload_size: u64,
}

impl DeliveryEvent {
    /// Creates a new event with the given outcome.
    pub fn new(
        webhook_id: impl Into<String>,
        event_type: impl Into<String>,
        status: DeliveryStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            webhook_id: webhook_id.into(),
            event_type: event_type.into(),
            status,
            response_time_ms: 0,
            triggered_at: Utc::now(),
            error_message: None,
            retry_count: 0,
            payload_size: 0,
        }
    }

    /// Creates a successful delivery record.
    pub fn success(
        webhook_id: impl Into<String>,
        event_type: impl Into<String>,
        response_time_ms: u64,
        payload_size: u64,
    ) -> Self {
        let mut event = Self::new(webhook_id, event_type, DeliveryStatus::Success);
        event.response_time_ms = response_time_ms;
        event.payload_size = payload_size;
        event
    }

    /// Creates a failed delivery record.
    pub fn failure(
        webhook_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(webhook_id, event_type, DeliveryStatus::Failed);
        event.error_message = Some(error.into());
        event
    }

    /// Creates a timed-out delivery record.
    pub fn timed_out(
        webhook_id: impl Into<String>,
        event_type: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        let mut event = Self::new(webhook_id, event_type, DeliveryStatus::Timeout);
        event.response_time_ms = response_time_ms;
        event.error_message = Some("Request timed out".to_string());
        event
    }

    /// Sets the response time.
    pub fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = ms;
        self
    }

    /// Sets the payload size.
    pub fn with_payload_size(mut self, bytes: u64) -> Self {
        self.payload_size = bytes;
        self
    }

    /// Sets the retry count.
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Sets the trigger timestamp.
    pub fn with_triggered_at(mut self, at: DateTime<Utc>) -> Self {
        self.triggered_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let ok = DeliveryEvent::success("wh-1", "order.created", 120, 256);
        assert_eq!(ok.status, DeliveryStatus::Success);
        assert_eq!(ok.response_time_ms, 120);
        assert_eq!(ok.payload_size, 256);
        assert!(ok.error_message.is_none());
        assert!(!ok.id.is_empty());

        let failed = DeliveryEvent::failure("wh-1", "order.created", "HTTP 500: Internal Server Error");
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert!(failed.error_message.as_deref().unwrap().contains("500"));

        let timeout = DeliveryEvent::timed_out("wh-1", "order.created", 30000);
        assert_eq!(timeout.status, DeliveryStatus::Timeout);
        assert_eq!(timeout.response_time_ms, 30000);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&DeliveryStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
        assert!(DeliveryStatus::Success.is_success());
        assert!(!DeliveryStatus::Failed.is_success());
    }
}
