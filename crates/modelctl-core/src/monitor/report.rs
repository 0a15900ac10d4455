//! Operator-facing monitoring report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Label, MetricsSnapshot, PredictionRecord};
use crate::monitor::alerts::Alert;

/// Outcome counts over a recent time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub hours: u32,
    pub predictions: usize,
    pub fake: usize,
    pub real: usize,
    pub errors: usize,
}

impl WindowSummary {
    pub fn from_records(hours: u32, records: &[PredictionRecord]) -> Self {
        let mut summary = Self {
            hours,
            predictions: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.outcome.label() {
                Some(Label::Fake) => summary.fake += 1,
                Some(Label::Real) => summary.real += 1,
                None => summary.errors += 1,
            }
        }
        summary
    }

    fn share(&self, count: usize) -> f64 {
        if self.predictions == 0 {
            0.0
        } else {
            count as f64 / self.predictions as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub generated_at: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
    pub window: WindowSummary,
    pub alerts: Vec<Alert>,
}

impl MonitorReport {
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(60);
        let m = &self.metrics;
        let w = &self.window;

        let mut out = String::new();
        out.push_str(&format!("{rule}\nPRODUCTION MONITORING REPORT\n{rule}\n\n"));

        out.push_str("Overall Metrics:\n");
        out.push_str(&format!("  Total Predictions: {}\n", m.total_predictions));
        out.push_str(&format!("  Fake Detected: {}\n", m.fake_count));
        out.push_str(&format!("  Real Detected: {}\n", m.real_count));
        out.push_str(&format!(
            "  Average Confidence: {:.2}%\n",
            m.avg_confidence * 100.0
        ));
        out.push_str(&format!("  Average Latency: {:.2}ms\n", m.avg_latency_ms));
        out.push_str(&format!("  Errors: {}\n", m.error_count));

        out.push_str(&format!("\nLast {} Hours:\n", w.hours));
        out.push_str(&format!("  Predictions: {}\n", w.predictions));
        if w.predictions > 0 {
            out.push_str(&format!(
                "  Fake: {} ({:.1}%)\n  Real: {} ({:.1}%)\n  Errors: {} ({:.1}%)\n",
                w.fake,
                w.share(w.fake),
                w.real,
                w.share(w.real),
                w.errors,
                w.share(w.errors),
            ));
        }

        if self.alerts.is_empty() {
            out.push_str("\nNo active alerts\n");
        } else {
            out.push_str(&format!("\nActive Alerts: {}\n", self.alerts.len()));
            for alert in &self.alerts {
                out.push_str(&format!(
                    "  - [{}] {}\n",
                    alert.severity.as_str().to_uppercase(),
                    alert.message
                ));
            }
        }

        out.push_str(&format!("\n{rule}\n"));
        out
    }
}
