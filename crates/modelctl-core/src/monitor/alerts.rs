//! Threshold alert rules over the production metrics snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::MetricsSnapshot;

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighErrorRate,
    HighLatency,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighErrorRate => "high_error_rate",
            AlertKind::HighLatency => "high_latency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
        }
    }
}

/// One fired rule. Alerts have no identity; each evaluation replaces the
/// previous set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Limits that trigger an alert when strictly exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Fraction of outcomes that may be errors (`0.01` = 1%).
    pub max_error_rate: f64,
    pub max_avg_latency_ms: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.01,
            max_avg_latency_ms: 500.0,
        }
    }
}

/// Evaluate every rule against `metrics`. Nothing fires before the first
/// outcome has been ingested.
pub fn evaluate_alerts(
    metrics: &MetricsSnapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let Some(error_rate) = metrics.error_rate() else {
        return alerts;
    };

    if error_rate > thresholds.max_error_rate {
        alerts.push(Alert {
            kind: AlertKind::HighErrorRate,
            severity: Severity::Warning,
            message: format!("Error rate: {:.2}%", error_rate * 100.0),
            timestamp: now,
        });
    }

    if metrics.avg_latency_ms > thresholds.max_avg_latency_ms {
        alerts.push(Alert {
            kind: AlertKind::HighLatency,
            severity: Severity::Warning,
            message: format!("Average latency: {:.2}ms", metrics.avg_latency_ms),
            timestamp: now,
        });
    }

    alerts
}
