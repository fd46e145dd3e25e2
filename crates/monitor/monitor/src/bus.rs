//! Monitor event bus for change notifications.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use hookpulse_store::DeliveryEvent;

use crate::aggregator::MonitorSnapshot;
use crate::alerts::Alert;
use crate::error::MonitorError;

/// Kinds of monitor events a subscriber can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorEventKind {
    /// A refresh produced a new snapshot.
    MetricsUpdated,
    /// An endpoint evaluation produced alerts.
    AlertTriggered,
    /// A delivery attempt completed.
    ExecutionCompleted,
}

/// A monitor change notification.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A refresh produced a new snapshot.
    MetricsUpdated(MonitorSnapshot),
    /// An endpoint evaluation produced alerts.
    AlertTriggered {
        /// Endpoint the alerts belong to.
        webhook_id: String,
        /// The fresh alerts.
        alerts: Vec<Alert>,
    },
    /// A delivery attempt completed.
    ExecutionCompleted(DeliveryEvent),
}

impl MonitorEvent {
    /// The kind of this event.
    pub fn kind(&self) -> MonitorEventKind {
        match self {
            MonitorEvent::MetricsUpdated(_) => MonitorEventKind::MetricsUpdated,
            MonitorEvent::AlertTriggered { .. } => MonitorEventKind::AlertTriggered,
            MonitorEvent::ExecutionCompleted(_) => MonitorEventKind::ExecutionCompleted,
        }
    }
}

/// Trait for monitor event subscribers.
#[async_trait]
pub trait MonitorSubscriber: Send + Sync {
    /// Returns a unique identifier for this subscriber.
    fn id(&self) -> &str;

    /// Handles an event.
    async fn notify(&self, event: &MonitorEvent) -> Result<(), MonitorError>;
}

/// Publish/subscribe hub for monitor events.
///
/// Subscribers register per event kind and unregister by id. Subscriber
/// failures are logged, never propagated into the publisher.
pub struct MonitorBus {
    subscribers: RwLock<HashMap<MonitorEventKind, Vec<Arc<dyn MonitorSubscriber>>>>,
}

impl MonitorBus {
    /// Creates a new bus.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to an event kind.
    pub async fn on(&self, kind: MonitorEventKind, subscriber: Arc<dyn MonitorSubscriber>) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.entry(kind).or_default().push(subscriber);
    }

    /// Unsubscribes by id. Returns whether a subscriber was removed.
    pub async fn off(&self, kind: MonitorEventKind, subscriber_id: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;
        if let Some(list) = subscribers.get_mut(&kind) {
            let before = list.len();
            list.retain(|s| s.id() != subscriber_id);
            return list.len() < before;
        }
        false
    }

    /// Publishes an event to all subscribers of its kind.
    pub async fn publish(&self, event: MonitorEvent) {
        let handlers: Vec<Arc<dyn MonitorSubscriber>> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .get(&event.kind())
                .map(|list| list.to_vec())
                .unwrap_or_default()
        };

        for handler in handlers {
            if let Err(e) = handler.notify(&event).await {
                tracing::error!(subscriber = handler.id(), error = %e, "monitor subscriber failed");
            }
        }
    }

    /// Number of subscribers for a kind.
    pub async fn subscriber_count(&self, kind: MonitorEventKind) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&kind).map(|list| list.len()).unwrap_or(0)
    }
}

impl Default for MonitorBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpulse_store::DeliveryStatus;

    struct Recorder {
        id: String,
        seen: Arc<RwLock<Vec<MonitorEventKind>>>,
    }

    #[async_trait]
    impl MonitorSubscriber for Recorder {
        fn id(&self) -> &str {
            &self.id
        }

        async fn notify(&self, event: &MonitorEvent) -> Result<(), MonitorError> {
            self.seen.write().await.push(event.kind());
            Ok(())
        }
    }

    fn execution_event() -> MonitorEvent {
        MonitorEvent::ExecutionCompleted(DeliveryEvent::new(
            "wh-1",
            "order.created",
            DeliveryStatus::Success,
        ))
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscribers_only() {
        let bus = MonitorBus::new();
        let seen = Arc::new(RwLock::new(Vec::new()));

        bus.on(
            MonitorEventKind::ExecutionCompleted,
            Arc::new(Recorder {
                id: "rec".to_string(),
                seen: seen.clone(),
            }),
        )
        .await;

        bus.publish(execution_event()).await;
        bus.publish(MonitorEvent::AlertTriggered {
            webhook_id: "wh-1".to_string(),
            alerts: vec![],
        })
        .await;

        let events = seen.read().await;
        assert_eq!(events.as_slice(), &[MonitorEventKind::ExecutionCompleted]);
    }

    #[tokio::test]
    async fn test_off_removes_subscriber() {
        let bus = MonitorBus::new();
        let seen = Arc::new(RwLock::new(Vec::new()));

        bus.on(
            MonitorEventKind::ExecutionCompleted,
            Arc::new(Recorder {
                id: "rec".to_string(),
                seen: seen.clone(),
            }),
        )
        .await;
        assert_eq!(
            bus.subscriber_count(MonitorEventKind::ExecutionCompleted).await,
            1
        );

        assert!(bus.off(MonitorEventKind::ExecutionCompleted, "rec").await);
        assert!(!bus.off(MonitorEventKind::ExecutionCompleted, "rec").await);

        bus.publish(execution_event()).await;
        assert!(seen.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_block_others() {
        struct Failing;

        #[async_trait]
        impl MonitorSubscriber for Failing {
            fn id(&self) -> &str {
                "failing"
            }

            async fn notify(&self, _event: &MonitorEvent) -> Result<(), MonitorError> {
                Err(MonitorError::Subscriber("boom".to_string()))
            }
        }

        let bus = MonitorBus::new();
        let seen = Arc::new(RwLock::new(Vec::new()));

        bus.on(MonitorEventKind::ExecutionCompleted, Arc::new(Failing)).await;
        bus.on(
            MonitorEventKind::ExecutionCompleted,
            Arc::new(Recorder {
                id: "rec".to_string(),
                seen: seen.clone(),
            }),
        )
        .await;

        bus.publish(execution_event()).await;
        assert_eq!(seen.read().await.len(), 1);
    }
}
