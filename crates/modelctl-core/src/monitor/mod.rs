//! Production monitor: outcome log, running metrics, threshold alerts.
//!
//! Files under the monitor directory:
//!
//! - `predictions.jsonl`: append-only outcome log, one record per line
//! - `metrics.json`: [`MetricsSnapshot`], rewritten after every outcome
//! - `alerts.json`: latest alert evaluation, rewritten on every check
//!
//! Ingestion appends and rewrites under an exclusive lock on
//! `monitor.lock`, so several serving processes on one host can log
//! concurrently without losing counts. The monitor shares nothing with the
//! registry.

mod alerts;
mod report;

pub use alerts::{evaluate_alerts, Alert, AlertKind, AlertThresholds, Severity};
pub use report::{MonitorReport, WindowSummary};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::config::LifecycleConfig;
use crate::domain::{MetricsSnapshot, PredictionEvent, PredictionRecord, Result};
use crate::metrics::COUNTERS;
use crate::obs;
use crate::store;

/// Window used by [`ProductionMonitor::generate_report`].
pub const REPORT_WINDOW_HOURS: u32 = 24;

const PREDICTIONS_FILE: &str = "predictions.jsonl";
const METRICS_FILE: &str = "metrics.json";
const ALERTS_FILE: &str = "alerts.json";
const LOCK_FILE: &str = "monitor.lock";

pub struct ProductionMonitor {
    dir: PathBuf,
    thresholds: AlertThresholds,
}

impl ProductionMonitor {
    /// Open the monitor at `dir`, creating it on first use.
    pub fn open(dir: impl AsRef<Path>, thresholds: AlertThresholds) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, thresholds })
    }

    pub fn from_config(config: &LifecycleConfig) -> Result<Self> {
        Self::open(&config.monitor_dir, config.alert_thresholds)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn predictions_path(&self) -> PathBuf {
        self.dir.join(PREDICTIONS_FILE)
    }

    fn metrics_path(&self) -> PathBuf {
        self.dir.join(METRICS_FILE)
    }

    fn alerts_path(&self) -> PathBuf {
        self.dir.join(ALERTS_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Ingest one served outcome, stamped with the current time.
    pub fn log_prediction(&self, event: PredictionEvent) -> Result<PredictionRecord> {
        self.log_prediction_at(event, Utc::now())
    }

    /// Ingest one outcome with an explicit ingestion time.
    ///
    /// The record is appended to the log before the snapshot is updated and
    /// persisted; both happen on every call. Non-finite confidence or
    /// latency is refused with `NonFinite` before anything is written.
    pub fn log_prediction_at(
        &self,
        event: PredictionEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<PredictionRecord> {
        event.outcome.check_finite()?;
        let record = event.into_record(timestamp);

        let total = store::with_exclusive(&self.lock_path(), || {
            store::append_jsonl(&self.predictions_path(), &record)?;

            let mut metrics: MetricsSnapshot = store::read_json_or_default(&self.metrics_path())?;
            metrics.record(&record.outcome, timestamp);
            store::write_json_atomic(&self.metrics_path(), &metrics)?;
            Ok(metrics.total_predictions)
        })?;

        COUNTERS.inc_predictions_logged();
        obs::emit_prediction_logged(&record.model_version, record.outcome.is_error(), total);
        Ok(record)
    }

    /// Current aggregate. Empty before the first outcome.
    pub fn metrics(&self) -> Result<MetricsSnapshot> {
        store::read_json_or_default(&self.metrics_path())
    }

    /// Outcomes ingested within the last `hours`, in log order.
    pub fn recent_predictions(&self, hours: u32) -> Result<Vec<PredictionRecord>> {
        self.recent_predictions_at(hours, Utc::now())
    }

    /// Outcomes with `timestamp >= now - hours`, in log order.
    ///
    /// Scans the whole log; there is no index.
    pub fn recent_predictions_at(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PredictionRecord>> {
        let cutoff = now - Duration::hours(i64::from(hours));
        let records: Vec<PredictionRecord> = store::read_jsonl(&self.predictions_path())?;
        Ok(records
            .into_iter()
            .filter(|r| r.timestamp >= cutoff)
            .collect())
    }

    /// Evaluate alert rules and replace `alerts.json` with the result,
    /// including when nothing fired.
    pub fn check_alerts(&self) -> Result<Vec<Alert>> {
        self.check_alerts_at(Utc::now())
    }

    pub fn check_alerts_at(&self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        let alerts = store::with_exclusive(&self.lock_path(), || {
            let metrics = self.metrics()?;
            let alerts = evaluate_alerts(&metrics, &self.thresholds, now);
            store::write_json_atomic(&self.alerts_path(), &alerts)?;
            Ok(alerts)
        })?;

        COUNTERS.add_alerts_raised(alerts.len() as u64);
        for alert in &alerts {
            obs::emit_alert_raised(alert.kind.as_str(), &alert.message);
        }
        Ok(alerts)
    }

    /// Alerts written by the last evaluation.
    pub fn persisted_alerts(&self) -> Result<Vec<Alert>> {
        store::read_json_or_default(&self.alerts_path())
    }

    /// Overall metrics, the last-24-hours breakdown, and a fresh alert
    /// evaluation.
    pub fn generate_report(&self) -> Result<MonitorReport> {
        self.generate_report_at(Utc::now())
    }

    pub fn generate_report_at(&self, now: DateTime<Utc>) -> Result<MonitorReport> {
        let metrics = self.metrics()?;
        let recent = self.recent_predictions_at(REPORT_WINDOW_HOURS, now)?;
        let alerts = self.check_alerts_at(now)?;

        Ok(MonitorReport {
            generated_at: now,
            metrics,
            window: WindowSummary::from_records(REPORT_WINDOW_HOURS, &recent),
            alerts,
        })
    }
}
