//! # Hookpulse Monitor
//!
//! Endpoint health monitoring for Hookpulse providing:
//! - Time-windowed delivery statistics
//! - A deterministic 0-100 health score per endpoint
//! - Threshold-derived typed alerts
//! - Fleet-wide aggregation with change notifications
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookpulse_monitor::{MonitorConfig, MonitoringAggregator};
//!
//! let aggregator = Arc::new(MonitoringAggregator::new(store, MonitorConfig::default()));
//! aggregator.track(endpoint).await;
//! aggregator.start();
//!
//! let snapshot = aggregator.snapshot().await;
//! ```

mod aggregator;
mod alerts;
mod bus;
mod error;
mod health;
mod stats;

pub use aggregator::{MonitorConfig, MonitorSnapshot, MonitoringAggregator};
pub use alerts::{evaluate_alerts, Alert, AlertKind, Severity};
pub use bus::{MonitorBus, MonitorEvent, MonitorEventKind, MonitorSubscriber};
pub use error::{MonitorError, MonitorResult};
pub use health::{health_score, health_status, HealthEvaluator, HealthMetrics, HealthStatus};
pub use stats::{EndpointRank, StatsAggregator, StatsWindow, WindowStats};
