//! Fleet-wide monitoring aggregation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;

use hookpulse_store::{DeliveryEvent, LogStore, WebhookEndpoint};

use crate::bus::{MonitorBus, MonitorEvent, MonitorEventKind, MonitorSubscriber};
use crate::error::{MonitorError, MonitorResult};
use crate::health::{HealthEvaluator, HealthMetrics};
use crate::stats::{StatsAggregator, StatsWindow, WindowStats};

/// Aggregator configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often the background refresh runs.
    pub poll_interval: Duration,
    /// Day buckets in the trend series.
    pub trend_days: u32,
    /// How many endpoints the top-performer list holds.
    pub top_performers: usize,
    /// Worker width for per-endpoint evaluation.
    pub refresh_width: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            trend_days: 7,
            top_performers: 5,
            refresh_width: 4,
        }
    }
}

impl MonitorConfig {
    /// Creates a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the trend length in days.
    pub fn trend_days(mut self, days: u32) -> Self {
        self.trend_days = days;
        self
    }

    /// Sets the top-performer list size.
    pub fn top_performers(mut self, count: usize) -> Self {
        self.top_performers = count;
        self
    }

    /// Sets the refresh worker width.
    pub fn refresh_width(mut self, width: usize) -> Self {
        self.refresh_width = width;
        self
    }
}

/// Immutable dashboard-level summary.
///
/// Returned by value: readers never observe a refresh in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Tracked endpoints.
    pub total_endpoints: usize,
    /// Tracked endpoints currently active.
    pub active_endpoints: usize,
    /// Union success percentage over the trailing 24 hours.
    pub success_rate_24h: f64,
    /// Mean of active endpoints' average response times.
    pub avg_response_time_ms: u64,
    /// Alerts across all tracked endpoints.
    pub active_alerts: usize,
    /// Best-scoring endpoints, highest first.
    pub top_performers: Vec<HealthMetrics>,
    /// Day-bucketed delivery trend, oldest first.
    pub trend: Vec<WindowStats>,
    /// When this snapshot was computed.
    pub generated_at: DateTime<Utc>,
}

/// Fans in health metrics across tracked endpoints.
///
/// The per-endpoint metrics mapping is mutated only inside
/// [`refresh`](Self::refresh); every reader receives an owned copy.
pub struct MonitoringAggregator {
    config: MonitorConfig,
    stats: StatsAggregator,
    evaluator: HealthEvaluator,
    endpoints: RwLock<HashMap<String, WebhookEndpoint>>,
    metrics: RwLock<HashMap<String, HealthMetrics>>,
    latest: RwLock<Option<MonitorSnapshot>>,
    bus: Arc<MonitorBus>,
    refresh_gate: tokio::sync::Mutex<()>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MonitoringAggregator {
    /// Creates an aggregator over a log store.
    pub fn new(store: Arc<dyn LogStore>, config: MonitorConfig) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        Self {
            config,
            stats: StatsAggregator::new(store.clone()),
            evaluator: HealthEvaluator::new(store),
            endpoints: RwLock::new(HashMap::new()),
            metrics: RwLock::new(HashMap::new()),
            latest: RwLock::new(None),
            bus: Arc::new(MonitorBus::new()),
            refresh_gate: tokio::sync::Mutex::new(()),
            task: std::sync::Mutex::new(None),
            shutdown,
        }
    }

    /// Tracks an endpoint.
    pub async fn track(&self, endpoint: WebhookEndpoint) {
        let mut endpoints = self.endpoints.write().await;
        endpoints.insert(endpoint.id.clone(), endpoint);
    }

    /// Stops tracking an endpoint, dropping its metrics.
    pub async fn untrack(&self, webhook_id: &str) -> Option<WebhookEndpoint> {
        let removed = {
            let mut endpoints = self.endpoints.write().await;
            endpoints.remove(webhook_id)
        };
        if removed.is_some() {
            let mut metrics = self.metrics.write().await;
            metrics.remove(webhook_id);
        }
        removed
    }

    /// Gets all tracked endpoints.
    pub async fn endpoints(&self) -> Vec<WebhookEndpoint> {
        let endpoints = self.endpoints.read().await;
        endpoints.values().cloned().collect()
    }

    /// Subscribes to a monitor event kind.
    pub async fn on(&self, kind: MonitorEventKind, subscriber: Arc<dyn MonitorSubscriber>) {
        self.bus.on(kind, subscriber).await;
    }

    /// Unsubscribes by id.
    pub async fn off(&self, kind: MonitorEventKind, subscriber_id: &str) -> bool {
        self.bus.off(kind, subscriber_id).await
    }

    /// Gets the event bus.
    pub fn bus(&self) -> Arc<MonitorBus> {
        self.bus.clone()
    }

    /// Latest summary, if a refresh has completed.
    pub async fn snapshot(&self) -> Option<MonitorSnapshot> {
        self.latest.read().await.clone()
    }

    /// Latest metrics for one endpoint.
    pub async fn metrics_for(&self, webhook_id: &str) -> Option<HealthMetrics> {
        let metrics = self.metrics.read().await;
        metrics.get(webhook_id).cloned()
    }

    /// Latest metrics for all tracked endpoints.
    pub async fn all_metrics(&self) -> Vec<HealthMetrics> {
        let metrics = self.metrics.read().await;
        metrics.values().cloned().collect()
    }

    /// Evaluates one tracked endpoint on demand.
    pub async fn evaluate_endpoint(&self, webhook_id: &str) -> MonitorResult<HealthMetrics> {
        let endpoint = {
            let endpoints = self.endpoints.read().await;
            endpoints
                .get(webhook_id)
                .cloned()
                .ok_or_else(|| MonitorError::NotTracked(webhook_id.to_string()))?
        };
        self.evaluator.evaluate(&endpoint).await
    }

    /// Records a completed delivery and triggers a coalesced refresh.
    pub async fn record_execution(&self, event: DeliveryEvent) -> MonitorResult<bool> {
        self.bus
            .publish(MonitorEvent::ExecutionCompleted(event))
            .await;
        self.refresh().await
    }

    /// Recomputes metrics and the snapshot.
    ///
    /// Re-entrant-safe: returns `Ok(false)` without doing work when
    /// another refresh is already running, so refreshes never pile up.
    pub async fn refresh(&self) -> MonitorResult<bool> {
        let Ok(_guard) = self.refresh_gate.try_lock() else {
            tracing::debug!("refresh in progress, tick skipped");
            return Ok(false);
        };
        self.refresh_inner().await?;
        Ok(true)
    }

    async fn refresh_inner(&self) -> MonitorResult<()> {
        let endpoints: Vec<WebhookEndpoint> = {
            let endpoints = self.endpoints.read().await;
            endpoints.values().cloned().collect()
        };
        let now = Utc::now();

        // Per-endpoint evaluation is best-effort: one failing endpoint
        // keeps its previous metrics and never aborts its siblings.
        let semaphore = Arc::new(Semaphore::new(self.config.refresh_width.max(1)));
        let mut handles = Vec::with_capacity(endpoints.len());
        for endpoint in &endpoints {
            let endpoint = endpoint.clone();
            let evaluator = self.evaluator.clone();
            let stats = self.stats.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let health = evaluator.evaluate_at(&endpoint, now).await;
                let day = stats
                    .window_stats_at(&endpoint.id, StatsWindow::H24, now)
                    .await;
                (endpoint, health, day)
            }));
        }

        let previous = self.metrics.read().await.clone();
        let mut fresh: HashMap<String, HealthMetrics> = HashMap::new();
        let mut carried: HashMap<String, HealthMetrics> = HashMap::new();
        let mut total_24h = 0u64;
        let mut successful_24h = 0u64;
        let mut response_averages = Vec::new();

        for handle in handles {
            let (endpoint, health, day) = match handle.await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(error = %e, "endpoint evaluation task failed");
                    continue;
                }
            };
            match (health, day) {
                (Ok(health), Ok(day)) => {
                    total_24h += day.total;
                    successful_24h += day.successful;
                    if endpoint.is_active && day.successful > 0 {
                        response_averages.push(day.avg_response_time_ms);
                    }
                    fresh.insert(endpoint.id.clone(), health);
                }
                (health, day) => {
                    let error = health.err().or(day.err());
                    tracing::warn!(
                        webhook_id = %endpoint.id,
                        error = %error.map(|e| e.to_string()).unwrap_or_default(),
                        "endpoint evaluation failed, keeping previous metrics"
                    );
                    if let Some(old) = previous.get(&endpoint.id) {
                        carried.insert(endpoint.id.clone(), old.clone());
                    }
                }
            }
        }

        let trend = self
            .stats
            .trend_at(None, self.config.trend_days, now)
            .await?;

        let mut all: HashMap<String, HealthMetrics> = fresh.clone();
        all.extend(carried);

        let mut top_performers: Vec<HealthMetrics> = all.values().cloned().collect();
        top_performers.sort_by(|a, b| {
            b.health_score
                .cmp(&a.health_score)
                .then(a.webhook_id.cmp(&b.webhook_id))
        });
        top_performers.truncate(self.config.top_performers);

        let success_rate_24h = if total_24h == 0 {
            0.0
        } else {
            ((successful_24h * 100) as f64 / total_24h as f64).round()
        };
        let avg_response_time_ms = if response_averages.is_empty() {
            0
        } else {
            (response_averages.iter().sum::<u64>() as f64 / response_averages.len() as f64).round()
                as u64
        };

        let snapshot = MonitorSnapshot {
            total_endpoints: endpoints.len(),
            active_endpoints: endpoints.iter().filter(|e| e.is_active).count(),
            success_rate_24h,
            avg_response_time_ms,
            active_alerts: all.values().map(|m| m.alerts.len()).sum(),
            top_performers,
            trend,
            generated_at: now,
        };

        {
            let mut metrics = self.metrics.write().await;
            *metrics = all;
        }
        {
            let mut latest = self.latest.write().await;
            *latest = Some(snapshot.clone());
        }

        self.bus
            .publish(MonitorEvent::MetricsUpdated(snapshot))
            .await;
        for (webhook_id, health) in &fresh {
            if !health.alerts.is_empty() {
                self.bus
                    .publish(MonitorEvent::AlertTriggered {
                        webhook_id: webhook_id.clone(),
                        alerts: health.alerts.clone(),
                    })
                    .await;
            }
        }

        tracing::debug!(
            endpoints = endpoints.len(),
            "monitor refresh completed"
        );
        Ok(())
    }

    /// Starts the background polling task.
    ///
    /// Returns false when already running. A tick firing while a prior
    /// refresh is still in flight is skipped, never queued.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().expect("task mutex poisoned");
        if task.is_some() {
            return false;
        }

        let this = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.config.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = this.refresh().await {
                            tracing::error!(error = %e, "monitor refresh failed");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
        *task = Some(handle);
        true
    }

    /// Stops the background polling task.
    pub async fn stop(&self) {
        let handle = {
            let mut task = self.task.lock().expect("task mutex poisoned");
            task.take()
        };
        if let Some(handle) = handle {
            self.shutdown.send(true).ok();
            handle.await.ok();
        }
    }
}
