//! Webhook endpoint configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Shared signing key. Deliveries are unsigned when absent.
    pub secret: Option<String>,
    /// Whether the endpoint currently receives deliveries.
    pub is_active: bool,
    /// When the endpoint was created.
    pub created_at: DateTime<Utc>,
    /// When the endpoint was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    /// Creates a new active endpoint.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            secret: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the signing secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the identifier explicitly.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Deactivates the endpoint.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether deliveries to this endpoint should be signed.
    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = WebhookEndpoint::new("orders", "https://example.com/hooks");
        assert!(endpoint.is_active);
        assert!(!endpoint.is_signed());
        assert!(!endpoint.id.is_empty());
    }

    #[test]
    fn test_endpoint_builders() {
        let endpoint = WebhookEndpoint::new("orders", "https://example.com/hooks")
            .with_secret("whsec_123")
            .deactivated();
        assert!(endpoint.is_signed());
        assert!(!endpoint.is_active);
    }
}
