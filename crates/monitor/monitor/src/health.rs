//! Endpoint health scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hookpulse_store::{DeliveryStatus, EventFilter, LogStore, WebhookEndpoint};

use crate::alerts::{evaluate_alerts, Alert};
use crate::error::MonitorResult;
use crate::stats::{StatsAggregator, StatsWindow, WindowStats};

/// Health classification for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Score >= 90.
    Healthy,
    /// Score >= 70.
    Degraded,
    /// Score < 70.
    Unhealthy,
    /// Endpoint is disabled; takes priority over the score.
    Inactive,
}

/// Computes the 0-100 health score for an endpoint.
///
/// Starts at 100 and applies at most one deduction per category, the
/// highest threshold exceeded:
///
/// | category          | threshold | deduction |
/// |-------------------|-----------|-----------|
/// | inactive          | -         | 50        |
/// | error rate        | >20 / >10 / >5 %   | 30 / 15 / 5 |
/// | avg response time | >5000 / >2000 / >1000 ms | 20 / 10 / 5 |
/// | no triggers       | total == 0 | 20       |
///
/// Identical inputs always yield the identical score.
pub fn health_score(stats: &WindowStats, is_active: bool) -> u8 {
    let mut score: i32 = 100;

    if !is_active {
        score -= 50;
    }

    let error_rate = stats.error_rate();
    if error_rate > 20.0 {
        score -= 30;
    } else if error_rate > 10.0 {
        score -= 15;
    } else if error_rate > 5.0 {
        score -= 5;
    }

    let avg = stats.avg_response_time_ms;
    if avg > 5000 {
        score -= 20;
    } else if avg > 2000 {
        score -= 10;
    } else if avg > 1000 {
        score -= 5;
    }

    if stats.total == 0 {
        score -= 20;
    }

    score.clamp(0, 100) as u8
}

/// Derives the status from activity and score.
///
/// Pure and deterministic: inactivity takes priority, then score bands.
pub fn health_status(is_active: bool, score: u8) -> HealthStatus {
    if !is_active {
        HealthStatus::Inactive
    } else if score >= 90 {
        HealthStatus::Healthy
    } else if score >= 70 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

/// Health metrics for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Evaluated endpoint.
    pub webhook_id: String,
    /// Success percentage over the trailing 7 days.
    pub uptime_percentage: f64,
    /// Rounded mean response time over successful deliveries.
    pub avg_response_time: u64,
    /// Failed-plus-timeout percentage.
    pub error_rate: f64,
    /// Most recent successful delivery.
    pub last_success: Option<DateTime<Utc>>,
    /// Most recent failed or timed-out delivery.
    pub last_failure: Option<DateTime<Utc>>,
    /// Attempts over the trailing 7 days.
    pub total_triggers: u64,
    /// Composite 0-100 score.
    pub health_score: u8,
    /// Derived status.
    pub status: HealthStatus,
    /// Active alerts.
    pub alerts: Vec<Alert>,
}

/// Evaluates endpoint health from the delivery log.
#[derive(Clone)]
pub struct HealthEvaluator {
    store: Arc<dyn LogStore>,
    stats: StatsAggregator,
}

impl HealthEvaluator {
    /// Creates a new evaluator over a log store.
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            stats: StatsAggregator::new(store.clone()),
            store,
        }
    }

    /// Evaluates an endpoint against the trailing 7 days.
    pub async fn evaluate(&self, endpoint: &WebhookEndpoint) -> MonitorResult<HealthMetrics> {
        self.evaluate_at(endpoint, Utc::now()).await
    }

    /// Evaluates an endpoint against the 7 days ending at `now`.
    pub async fn evaluate_at(
        &self,
        endpoint: &WebhookEndpoint,
        now: DateTime<Utc>,
    ) -> MonitorResult<HealthMetrics> {
        let stats = self
            .stats
            .window_stats_at(&endpoint.id, StatsWindow::D7, now)
            .await?;

        let score = health_score(&stats, endpoint.is_active);
        let status = health_status(endpoint.is_active, score);
        let alerts = evaluate_alerts(&stats, endpoint.is_active);

        let last_success = self
            .last_event(&endpoint.id, &[DeliveryStatus::Success])
            .await?;
        let last_failure = self
            .last_event(
                &endpoint.id,
                &[DeliveryStatus::Failed, DeliveryStatus::Timeout],
            )
            .await?;

        Ok(HealthMetrics {
            webhook_id: endpoint.id.clone(),
            uptime_percentage: stats.success_rate,
            avg_response_time: stats.avg_response_time_ms,
            error_rate: stats.error_rate(),
            last_success,
            last_failure,
            total_triggers: stats.total,
            health_score: score,
            status,
            alerts,
        })
    }

    async fn last_event(
        &self,
        webhook_id: &str,
        statuses: &[DeliveryStatus],
    ) -> MonitorResult<Option<DateTime<Utc>>> {
        let filter = EventFilter::new()
            .for_webhook(webhook_id)
            .with_statuses(statuses.iter().copied());
        let events = self.store.query(&filter, 1).await?;
        Ok(events.first().map(|e| e.triggered_at))
    }
}
