//! Log store abstraction for delivery events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::event::{DeliveryEvent, DeliveryStatus};

/// Filter for delivery event queries.
///
/// Time bounds are half-open: `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Restrict to a single endpoint.
    pub webhook_id: Option<String>,
    /// Restrict to the given statuses.
    pub statuses: Option<Vec<DeliveryStatus>>,
    /// Only events with `triggered_at >= since`.
    pub since: Option<DateTime<Utc>>,
    /// Only events with `triggered_at < until`.
    pub until: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Creates an empty filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to one endpoint.
    pub fn for_webhook(mut self, webhook_id: impl Into<String>) -> Self {
        self.webhook_id = Some(webhook_id.into());
        self
    }

    /// Restricts the filter to the given statuses.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = DeliveryStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Sets the inclusive lower time bound.
    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    /// Sets the exclusive upper time bound.
    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    /// Checks whether an event matches this filter.
    pub fn matches(&self, event: &DeliveryEvent) -> bool {
        if let Some(ref webhook_id) = self.webhook_id {
            if &event.webhook_id != webhook_id {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&event.status) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.triggered_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.triggered_at >= until {
                return false;
            }
        }
        true
    }
}

/// Trait for delivery log backends.
///
/// Records are write-once: `append` is the only mutation, and stored
/// events are never updated.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Appends a delivery event, returning its id.
    async fn append(&self, event: DeliveryEvent) -> StoreResult<String>;

    /// Queries events matching the filter, newest first.
    async fn query(&self, filter: &EventFilter, limit: usize) -> StoreResult<Vec<DeliveryEvent>>;

    /// Counts events matching the filter.
    async fn count(&self, filter: &EventFilter) -> StoreResult<u64>;
}

/// In-memory log store.
pub struct InMemoryLogStore {
    events: RwLock<Vec<DeliveryEvent>>,
}

impl InMemoryLogStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Deletes events older than the given number of days.
    ///
    /// Returns how many events were removed.
    pub async fn cleanup_older_than(&self, days: u32) -> usize {
        let mut events = self.events.write().await;
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let before_len = events.len();
        events.retain(|e| e.triggered_at > cutoff);
        before_len - events.len()
    }
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, event: DeliveryEvent) -> StoreResult<String> {
        let id = event.id.clone();
        let mut events = self.events.write().await;
        events.push(event);
        Ok(id)
    }

    async fn query(&self, filter: &EventFilter, limit: usize) -> StoreResult<Vec<DeliveryEvent>> {
        let events = self.events.read().await;
        let mut matched: Vec<DeliveryEvent> = events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<u64> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| filter.matches(e)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(webhook_id: &str, status: DeliveryStatus, minutes_ago: i64) -> DeliveryEvent {
        DeliveryEvent::new(webhook_id, "test.event", status)
            .with_triggered_at(Utc::now() - chrono::Duration::minutes(minutes_ago))
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let store = InMemoryLogStore::new();

        let event = DeliveryEvent::success("wh-1", "order.created", 120, 256);
        let id = store.append(event.clone()).await.unwrap();
        assert_eq!(id, event.id);

        let all = store.query(&EventFilter::new(), 10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, event.id);
    }

    #[tokio::test]
    async fn test_query_is_newest_first_and_limited() {
        let store = InMemoryLogStore::new();
        for i in 0..5 {
            store
                .append(event_at("wh-1", DeliveryStatus::Success, i * 10))
                .await
                .unwrap();
        }

        let results = store.query(&EventFilter::new(), 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].triggered_at > results[1].triggered_at);
        assert!(results[1].triggered_at > results[2].triggered_at);
    }

    #[tokio::test]
    async fn test_filter_by_webhook_and_status() {
        let store = InMemoryLogStore::new();
        store.append(event_at("wh-1", DeliveryStatus::Success, 1)).await.unwrap();
        store.append(event_at("wh-1", DeliveryStatus::Failed, 2)).await.unwrap();
        store.append(event_at("wh-2", DeliveryStatus::Failed, 3)).await.unwrap();

        let filter = EventFilter::new()
            .for_webhook("wh-1")
            .with_statuses([DeliveryStatus::Failed]);
        assert_eq!(store.count(&filter).await.unwrap(), 1);

        let results = store.query(&filter, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].webhook_id, "wh-1");
        assert_eq!(results[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn test_time_bounds_are_half_open() {
        let store = InMemoryLogStore::new();
        let at = Utc::now();
        store
            .append(DeliveryEvent::new("wh-1", "t", DeliveryStatus::Success).with_triggered_at(at))
            .await
            .unwrap();

        // Inclusive lower bound matches the exact timestamp.
        let since = EventFilter::new().since(at);
        assert_eq!(store.count(&since).await.unwrap(), 1);

        // Exclusive upper bound excludes it.
        let until = EventFilter::new().until(at);
        assert_eq!(store.count(&until).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let store = InMemoryLogStore::new();
        store
            .append(
                DeliveryEvent::new("wh-1", "t", DeliveryStatus::Success)
                    .with_triggered_at(Utc::now() - chrono::Duration::days(40)),
            )
            .await
            .unwrap();
        store.append(event_at("wh-1", DeliveryStatus::Success, 5)).await.unwrap();

        let removed = store.cleanup_older_than(30).await;
        assert_eq!(removed, 1);
        assert_eq!(store.count(&EventFilter::new()).await.unwrap(), 1);
    }
}
