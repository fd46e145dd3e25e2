//! Threshold-derived alerts.

use serde::{Deserialize, Serialize};

use crate::stats::WindowStats;

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Failed-plus-timeout rate is elevated.
    HighErrorRate,
    /// Successful responses are slow.
    SlowResponse,
    /// Deliveries keep hitting the deadline.
    FrequentTimeouts,
    /// An active endpoint received nothing in the window.
    NoActivity,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A typed alert derived from window stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: Severity,
}

impl Alert {
    fn new(kind: AlertKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity,
        }
    }
}

/// Derives alerts from window stats.
///
/// Thresholds are boundary-exact: a rate of exactly 20.0 does not trip
/// the `> 20` branch. Alerts are recomputed fresh on every call; nothing
/// is persisted or acknowledged here.
pub fn evaluate_alerts(stats: &WindowStats, is_active: bool) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let error_rate = stats.error_rate();
    if error_rate > 20.0 {
        alerts.push(Alert::new(
            AlertKind::HighErrorRate,
            Severity::High,
            format!("Error rate {error_rate:.1}% exceeds 20%"),
        ));
    } else if error_rate > 10.0 {
        alerts.push(Alert::new(
            AlertKind::HighErrorRate,
            Severity::Medium,
            format!("Error rate {error_rate:.1}% exceeds 10%"),
        ));
    }

    let avg = stats.avg_response_time_ms;
    if avg > 5000 {
        alerts.push(Alert::new(
            AlertKind::SlowResponse,
            Severity::High,
            format!("Average response time {avg}ms exceeds 5000ms"),
        ));
    } else if avg > 2000 {
        alerts.push(Alert::new(
            AlertKind::SlowResponse,
            Severity::Medium,
            format!("Average response time {avg}ms exceeds 2000ms"),
        ));
    }

    let timeout_rate = stats.timeout_rate();
    if timeout_rate > 10.0 {
        alerts.push(Alert::new(
            AlertKind::FrequentTimeouts,
            Severity::High,
            format!("Timeout rate {timeout_rate:.1}% exceeds 10%"),
        ));
    }

    if stats.total == 0 && is_active {
        alerts.push(Alert::new(
            AlertKind::NoActivity,
            Severity::Low,
            format!("No deliveries recorded in the last {}", stats.window),
        ));
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: u64, failed: u64, timeouts: u64, avg_ms: u64) -> WindowStats {
        WindowStats {
            window: "7d".to_string(),
            total,
            successful: total - failed - timeouts,
            failed,
            timeouts,
            success_rate: 0.0,
            avg_response_time_ms: avg_ms,
        }
    }

    #[test]
    fn test_error_rate_boundary_is_exact() {
        // Exactly 20.0% stays at medium severity.
        let at_boundary = stats(1000, 200, 0, 100);
        let alerts = evaluate_alerts(&at_boundary, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::HighErrorRate);
        assert_eq!(alerts[0].severity, Severity::Medium);

        // 20.1% crosses it.
        let over = stats(1000, 201, 0, 100);
        let alerts = evaluate_alerts(&over, true);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn test_no_alerts_when_healthy() {
        let healthy = stats(100, 5, 0, 300);
        assert!(evaluate_alerts(&healthy, true).is_empty());
    }

    #[test]
    fn test_slow_response_tiers() {
        let medium = stats(10, 0, 0, 2001);
        assert_eq!(
            evaluate_alerts(&medium, true)[0].severity,
            Severity::Medium
        );

        let high = stats(10, 0, 0, 5001);
        assert_eq!(evaluate_alerts(&high, true)[0].severity, Severity::High);

        // Exactly at the lower boundary: no alert.
        let at_boundary = stats(10, 0, 0, 2000);
        assert!(evaluate_alerts(&at_boundary, true).is_empty());
    }

    #[test]
    fn test_frequent_timeouts() {
        let timeouts = stats(100, 0, 11, 100);
        let alerts = evaluate_alerts(&timeouts, true);
        // 11% timeouts also counts toward the error rate.
        assert!(alerts.iter().any(|a| a.kind == AlertKind::FrequentTimeouts));
        assert!(alerts.iter().any(|a| a.kind == AlertKind::HighErrorRate));
    }

    #[test]
    fn test_no_activity_requires_active_endpoint() {
        let empty = WindowStats::empty("7d");

        let alerts = evaluate_alerts(&empty, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::NoActivity);
        assert_eq!(alerts[0].severity, Severity::Low);

        assert!(evaluate_alerts(&empty, false).is_empty());
    }

    #[test]
    fn test_alerts_coexist() {
        let bad = stats(100, 30, 15, 6000);
        let kinds: Vec<AlertKind> = evaluate_alerts(&bad, true).iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AlertKind::HighErrorRate));
        assert!(kinds.contains(&AlertKind::SlowResponse));
        assert!(kinds.contains(&AlertKind::FrequentTimeouts));
    }

    #[test]
    fn test_alert_type_serialization() {
        let alert = Alert::new(AlertKind::HighErrorRate, Severity::High, "x");
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"type\":\"high_error_rate\""));
        assert!(json.contains("\"severity\":\"high\""));
    }
}
