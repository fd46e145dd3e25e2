//! # Hookpulse Store
//!
//! Delivery log store for Hookpulse providing:
//! - Append-only delivery event records
//! - A pluggable log-store query interface
//! - Webhook endpoint configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookpulse_store::{DeliveryEvent, EventFilter, InMemoryLogStore, LogStore};
//!
//! let store = InMemoryLogStore::new();
//! store.append(DeliveryEvent::success("wh-1", "order.created", 120, 256)).await?;
//!
//! let recent = store
//!     .query(&EventFilter::new().for_webhook("wh-1"), 50)
//!     .await?;
//! ```

mod endpoint;
mod error;
mod event;
mod store;

pub use endpoint::WebhookEndpoint;
pub use error::{StoreError, StoreResult};
pub use event::{DeliveryEvent, DeliveryStatus};
pub use store::{EventFilter, InMemoryLogStore, LogStore};
