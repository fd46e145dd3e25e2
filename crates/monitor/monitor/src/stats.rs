//! Time-windowed delivery statistics.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use hookpulse_store::{DeliveryEvent, DeliveryStatus, EventFilter, LogStore, WebhookEndpoint};

use crate::error::MonitorResult;

/// Trailing time range bounding a stats query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatsWindow {
    /// Last hour.
    H1,
    /// Last 6 hours.
    H6,
    /// Last 24 hours.
    H24,
    /// Last 7 days.
    D7,
    /// Last 30 days.
    D30,
}

impl StatsWindow {
    /// Length of the window.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            StatsWindow::H1 => chrono::Duration::hours(1),
            StatsWindow::H6 => chrono::Duration::hours(6),
            StatsWindow::H24 => chrono::Duration::hours(24),
            StatsWindow::D7 => chrono::Duration::days(7),
            StatsWindow::D30 => chrono::Duration::days(30),
        }
    }

    /// Short label (e.g., "24h").
    pub fn label(&self) -> &'static str {
        match self {
            StatsWindow::H1 => "1h",
            StatsWindow::H6 => "6h",
            StatsWindow::H24 => "24h",
            StatsWindow::D7 => "7d",
            StatsWindow::D30 => "30d",
        }
    }
}

/// Aggregated delivery counts and rates for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Window label ("24h", "2024-05-01", ...).
    pub window: String,
    /// All attempts in the window.
    pub total: u64,
    /// Attempts with a 2xx response.
    pub successful: u64,
    /// Attempts that failed (non-2xx or network).
    pub failed: u64,
    /// Attempts that hit the deadline.
    pub timeouts: u64,
    /// Rounded success percentage, 0 when the window is empty.
    pub success_rate: f64,
    /// Rounded mean response time over successful attempts, 0 when none.
    pub avg_response_time_ms: u64,
}

impl WindowStats {
    /// Creates empty stats for a window.
    pub fn empty(window: impl Into<String>) -> Self {
        Self {
            window: window.into(),
            total: 0,
            successful: 0,
            failed: 0,
            timeouts: 0,
            success_rate: 0.0,
            avg_response_time_ms: 0,
        }
    }

    /// Aggregates a set of events into window stats.
    pub fn from_events(window: impl Into<String>, events: &[DeliveryEvent]) -> Self {
        let total = events.len() as u64;
        let successful = events
            .iter()
            .filter(|e| e.status == DeliveryStatus::Success)
            .count() as u64;
        let failed = events
            .iter()
            .filter(|e| e.status == DeliveryStatus::Failed)
            .count() as u64;
        let timeouts = events
            .iter()
            .filter(|e| e.status == DeliveryStatus::Timeout)
            .count() as u64;

        let success_rate = rate(successful, total).round();

        let success_time_sum: u64 = events
            .iter()
            .filter(|e| e.status == DeliveryStatus::Success)
            .map(|e| e.response_time_ms)
            .sum();
        let avg_response_time_ms = if successful == 0 {
            0
        } else {
            (success_time_sum as f64 / successful as f64).round() as u64
        };

        Self {
            window: window.into(),
            total,
            successful,
            failed,
            timeouts,
            success_rate,
            avg_response_time_ms,
        }
    }

    /// Failed-plus-timeout percentage, 0 when the window is empty.
    pub fn error_rate(&self) -> f64 {
        rate(self.failed + self.timeouts, self.total)
    }

    /// Timeout percentage, 0 when the window is empty.
    pub fn timeout_rate(&self) -> f64 {
        rate(self.timeouts, self.total)
    }
}

/// Percentage of `part` in `total`; 0 when `total` is 0, never NaN.
fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part * 100) as f64 / total as f64
    }
}

/// One row of a top-endpoint ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRank {
    /// Ranked endpoint.
    pub webhook_id: String,
    /// Attempts in the trailing 24 hours.
    pub trigger_count: u64,
    /// Rounded success percentage over the same range.
    pub success_rate: f64,
}

/// Computes per-window statistics from a delivery log.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn LogStore>,
}

impl StatsAggregator {
    /// Creates a new aggregator over a log store.
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Stats for one endpoint over a trailing window ending now.
    pub async fn window_stats(
        &self,
        webhook_id: &str,
        window: StatsWindow,
    ) -> MonitorResult<WindowStats> {
        self.window_stats_at(webhook_id, window, Utc::now()).await
    }

    /// Stats for one endpoint over a trailing window ending at `now`.
    pub async fn window_stats_at(
        &self,
        webhook_id: &str,
        window: StatsWindow,
        now: DateTime<Utc>,
    ) -> MonitorResult<WindowStats> {
        let filter = EventFilter::new()
            .for_webhook(webhook_id)
            .since(now - window.duration());
        let events = self.store.query(&filter, usize::MAX).await?;
        Ok(WindowStats::from_events(window.label(), &events))
    }

    /// Day-bucketed trend for one endpoint, oldest bucket first.
    pub async fn daily_trend(&self, webhook_id: &str, days: u32) -> MonitorResult<Vec<WindowStats>> {
        self.trend_at(Some(webhook_id), days, Utc::now()).await
    }

    /// Day-bucketed trend across all endpoints, oldest bucket first.
    pub async fn fleet_daily_trend(&self, days: u32) -> MonitorResult<Vec<WindowStats>> {
        self.trend_at(None, days, Utc::now()).await
    }

    /// Day-bucketed trend ending at `now`.
    ///
    /// Buckets are fixed half-open UTC calendar days
    /// `[start_of_day, end_of_day)`; the current partial day is the last
    /// bucket.
    pub async fn trend_at(
        &self,
        webhook_id: Option<&str>,
        days: u32,
        now: DateTime<Utc>,
    ) -> MonitorResult<Vec<WindowStats>> {
        let mut buckets = Vec::with_capacity(days as usize);
        for offset in (0..days as i64).rev() {
            let day = (now - chrono::Duration::days(offset)).date_naive();
            let start = day.and_time(NaiveTime::MIN).and_utc();
            let end = start + chrono::Duration::days(1);

            let mut filter = EventFilter::new().since(start).until(end);
            if let Some(webhook_id) = webhook_id {
                filter = filter.for_webhook(webhook_id);
            }
            let events = self.store.query(&filter, usize::MAX).await?;
            buckets.push(WindowStats::from_events(
                day.format("%Y-%m-%d").to_string(),
                &events,
            ));
        }
        Ok(buckets)
    }

    /// Ranks endpoints by trailing-24h activity.
    ///
    /// Orders by trigger count descending, ties by success rate
    /// descending, then by id ascending.
    pub async fn top_endpoints(
        &self,
        endpoints: &[WebhookEndpoint],
        n: usize,
    ) -> MonitorResult<Vec<EndpointRank>> {
        self.top_endpoints_at(endpoints, n, Utc::now()).await
    }

    /// Ranks endpoints by 24h activity ending at `now`.
    pub async fn top_endpoints_at(
        &self,
        endpoints: &[WebhookEndpoint],
        n: usize,
        now: DateTime<Utc>,
    ) -> MonitorResult<Vec<EndpointRank>> {
        let mut ranks = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let stats = self
                .window_stats_at(&endpoint.id, StatsWindow::H24, now)
                .await?;
            ranks.push(EndpointRank {
                webhook_id: endpoint.id.clone(),
                trigger_count: stats.total,
                success_rate: stats.success_rate,
            });
        }

        ranks.sort_by(|a, b| {
            b.trigger_count
                .cmp(&a.trigger_count)
                .then(b.success_rate.total_cmp(&a.success_rate))
                .then(a.webhook_id.cmp(&b.webhook_id))
        });
        ranks.truncate(n);
        Ok(ranks)
    }

    /// Gets the log store.
    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpulse_store::InMemoryLogStore;

    fn event(
        webhook_id: &str,
        status: DeliveryStatus,
        response_time_ms: u64,
        at: DateTime<Utc>,
    ) -> DeliveryEvent {
        DeliveryEvent::new(webhook_id, "test.event", status)
            .with_response_time(response_time_ms)
            .with_triggered_at(at)
    }

    async fn seeded_store(events: Vec<DeliveryEvent>) -> Arc<InMemoryLogStore> {
        let store = Arc::new(InMemoryLogStore::new());
        for e in events {
            store.append(e).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_empty_window_yields_zeroes() {
        let store = seeded_store(vec![]).await;
        let stats = StatsAggregator::new(store);

        let result = stats
            .window_stats("wh-1", StatsWindow::H24)
            .await
            .unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.avg_response_time_ms, 0);
        assert_eq!(result.error_rate(), 0.0);
        assert_eq!(result.timeout_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_window_stats_counts_and_rates() {
        let now = Utc::now();
        let mut events = Vec::new();
        for _ in 0..6 {
            events.push(event("wh-1", DeliveryStatus::Success, 100, now - chrono::Duration::hours(1)));
        }
        events.push(event("wh-1", DeliveryStatus::Failed, 5000, now - chrono::Duration::hours(2)));
        events.push(event("wh-1", DeliveryStatus::Timeout, 30000, now - chrono::Duration::hours(3)));
        // Outside the 24h window.
        events.push(event("wh-1", DeliveryStatus::Failed, 100, now - chrono::Duration::hours(30)));
        // Different endpoint.
        events.push(event("wh-2", DeliveryStatus::Success, 100, now - chrono::Duration::hours(1)));

        let stats = StatsAggregator::new(seeded_store(events).await);
        let result = stats
            .window_stats_at("wh-1", StatsWindow::H24, now)
            .await
            .unwrap();

        assert_eq!(result.total, 8);
        assert_eq!(result.successful, 6);
        assert_eq!(result.failed, 1);
        assert_eq!(result.timeouts, 1);
        assert_eq!(result.success_rate, 75.0);
        // Mean over successful events only.
        assert_eq!(result.avg_response_time_ms, 100);
        assert_eq!(result.error_rate(), 25.0);
    }

    #[tokio::test]
    async fn test_avg_response_time_ignores_failures() {
        let now = Utc::now();
        let events = vec![
            event("wh-1", DeliveryStatus::Success, 100, now),
            event("wh-1", DeliveryStatus::Success, 200, now),
            event("wh-1", DeliveryStatus::Failed, 30000, now),
        ];
        let stats = StatsAggregator::new(seeded_store(events).await);

        let result = stats
            .window_stats_at("wh-1", StatsWindow::H1, now)
            .await
            .unwrap();
        assert_eq!(result.avg_response_time_ms, 150);
    }

    #[tokio::test]
    async fn test_daily_trend_buckets_are_half_open_days() {
        let now = Utc::now();
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        let events = vec![
            // Just inside today's bucket.
            event("wh-1", DeliveryStatus::Success, 100, today_start),
            // Last instant of yesterday belongs to yesterday's bucket.
            event(
                "wh-1",
                DeliveryStatus::Failed,
                100,
                today_start - chrono::Duration::milliseconds(1),
            ),
        ];
        let stats = StatsAggregator::new(seeded_store(events).await);

        let trend = stats.trend_at(Some("wh-1"), 7, now).await.unwrap();
        assert_eq!(trend.len(), 7);

        let today = trend.last().unwrap();
        assert_eq!(today.total, 1);
        assert_eq!(today.successful, 1);

        let yesterday = &trend[trend.len() - 2];
        assert_eq!(yesterday.total, 1);
        assert_eq!(yesterday.failed, 1);
    }

    #[tokio::test]
    async fn test_top_endpoints_ordering_is_deterministic() {
        let now = Utc::now();
        let mut events = Vec::new();
        // wh-a: 3 triggers, 2 successful. wh-b: 3 triggers, all successful.
        // wh-c: 1 trigger.
        for _ in 0..2 {
            events.push(event("wh-a", DeliveryStatus::Success, 100, now));
        }
        events.push(event("wh-a", DeliveryStatus::Failed, 100, now));
        for _ in 0..3 {
            events.push(event("wh-b", DeliveryStatus::Success, 100, now));
        }
        events.push(event("wh-c", DeliveryStatus::Success, 100, now));

        let stats = StatsAggregator::new(seeded_store(events).await);
        let endpoints = vec![
            WebhookEndpoint::new("a", "https://a.example.com").with_id("wh-a"),
            WebhookEndpoint::new("b", "https://b.example.com").with_id("wh-b"),
            WebhookEndpoint::new("c", "https://c.example.com").with_id("wh-c"),
        ];

        let ranks = stats.top_endpoints_at(&endpoints, 2, now).await.unwrap();
        assert_eq!(ranks.len(), 2);
        // Same trigger count: higher success rate wins.
        assert_eq!(ranks[0].webhook_id, "wh-b");
        assert_eq!(ranks[1].webhook_id, "wh-a");
    }

    #[test]
    fn test_rate_has_no_divide_by_zero() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);
        assert_eq!(rate(1, 4), 25.0);
    }

    /// Log store whose queries always fail.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl LogStore for BrokenStore {
        async fn append(
            &self,
            _event: DeliveryEvent,
        ) -> hookpulse_store::StoreResult<String> {
            Err(hookpulse_store::StoreError::Backend("offline".to_string()))
        }

        async fn query(
            &self,
            _filter: &EventFilter,
            _limit: usize,
        ) -> hookpulse_store::StoreResult<Vec<DeliveryEvent>> {
            Err(hookpulse_store::StoreError::Backend("offline".to_string()))
        }

        async fn count(&self, _filter: &EventFilter) -> hookpulse_store::StoreResult<u64> {
            Err(hookpulse_store::StoreError::Backend("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates_instead_of_zeroing() {
        let stats = StatsAggregator::new(Arc::new(BrokenStore));

        let err = stats.window_stats("wh-1", StatsWindow::H24).await.unwrap_err();
        assert!(matches!(err, crate::error::MonitorError::Store(_)));

        assert!(stats.daily_trend("wh-1", 7).await.is_err());
    }
}
