//! Production prediction outcomes and the running metrics aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ModelctlError;

/// Classifier verdict for a served input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Fake,
    Real,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fake => "fake",
            Label::Real => "real",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fake" => Ok(Label::Fake),
            "real" => Ok(Label::Real),
            other => Err(format!("unknown label: {other}")),
        }
    }
}

/// What happened for one served request.
///
/// Serialized untagged so that log lines carry either
/// `prediction`/`confidence`/`latency_ms` or `error`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Inference failed; no classification was produced.
    Failure { error: String },
    /// Inference succeeded.
    Prediction {
        prediction: Label,
        confidence: f64,
        latency_ms: f64,
    },
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    pub fn label(&self) -> Option<Label> {
        match self {
            Outcome::Prediction { prediction, .. } => Some(*prediction),
            Outcome::Failure { .. } => None,
        }
    }

    /// Reject NaN or infinite measurements. JSON has no encoding for them,
    /// so one would poison the persisted averages.
    pub fn check_finite(&self) -> crate::domain::Result<()> {
        if let Outcome::Prediction {
            confidence,
            latency_ms,
            ..
        } = self
        {
            for (field, value) in [("confidence", confidence), ("latency_ms", latency_ms)] {
                if !value.is_finite() {
                    return Err(ModelctlError::NonFinite {
                        field: field.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Outcome reported by the serving layer, before ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEvent {
    pub model_version: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl PredictionEvent {
    /// A successful classification.
    pub fn prediction(
        model_version: impl Into<String>,
        prediction: Label,
        confidence: f64,
        latency_ms: f64,
    ) -> Self {
        Self {
            model_version: model_version.into(),
            outcome: Outcome::Prediction {
                prediction,
                confidence,
                latency_ms,
            },
        }
    }

    /// A failed inference.
    pub fn failure(model_version: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
            outcome: Outcome::Failure {
                error: error.into(),
            },
        }
    }

    /// Stamp the event with its ingestion time.
    pub fn into_record(self, timestamp: DateTime<Utc>) -> PredictionRecord {
        PredictionRecord {
            model_version: self.model_version,
            outcome: self.outcome,
            timestamp,
        }
    }
}

/// One line of the append-only outcome log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub model_version: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Assigned by the monitor at ingestion.
    pub timestamp: DateTime<Utc>,
}

/// Running aggregate over every ingested outcome.
///
/// `fake_count + real_count + error_count == total_predictions`. The
/// averages are means over non-error outcomes only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_predictions: u64,
    pub fake_count: u64,
    pub real_count: u64,
    pub error_count: u64,
    pub avg_confidence: f64,
    pub avg_latency_ms: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl MetricsSnapshot {
    /// Number of outcomes that produced a classification.
    pub fn classified(&self) -> u64 {
        self.fake_count + self.real_count
    }

    /// Share of outcomes that were errors, or `None` before the first outcome.
    pub fn error_rate(&self) -> Option<f64> {
        (self.total_predictions > 0)
            .then(|| self.error_count as f64 / self.total_predictions as f64)
    }

    /// Fold one outcome into the aggregate.
    pub fn record(&mut self, outcome: &Outcome, at: DateTime<Utc>) {
        self.total_predictions += 1;
        self.last_updated = Some(at);

        match outcome {
            Outcome::Failure { .. } => self.error_count += 1,
            Outcome::Prediction {
                prediction,
                confidence,
                latency_ms,
            } => {
                match prediction {
                    Label::Fake => self.fake_count += 1,
                    Label::Real => self.real_count += 1,
                }
                let n = self.classified() as f64;
                self.avg_confidence = incremental_mean(self.avg_confidence, *confidence, n);
                self.avg_latency_ms = incremental_mean(self.avg_latency_ms, *latency_ms, n);
            }
        }
    }
}

/// `(old * (n - 1) + x) / n`, where `n` already counts `x`.
fn incremental_mean(old: f64, x: f64, n: f64) -> f64 {
    (old * (n - 1.0) + x) / n
}
