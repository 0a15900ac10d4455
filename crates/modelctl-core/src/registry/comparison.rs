//! Side-by-side metric comparison of two registered versions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ModelVersion;

/// Change of one metric from version A to version B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub name: String,
    /// `None` when A never recorded this metric.
    pub value_a: Option<f64>,
    pub value_b: f64,
    /// `value_b - value_a`.
    pub delta: Option<f64>,
    /// `delta / value_a * 100`, reported as `0` when `value_a == 0`.
    pub percent: Option<f64>,
}

/// Read-only report comparing version B against baseline A.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub version_a: String,
    pub version_b: String,
    pub metrics_a: BTreeMap<String, f64>,
    pub metrics_b: BTreeMap<String, f64>,
    /// One entry per metric recorded by B.
    pub deltas: Vec<MetricDelta>,
}

impl ModelComparison {
    pub fn between(a: &ModelVersion, b: &ModelVersion) -> Self {
        let deltas = b
            .metrics
            .iter()
            .map(|(name, &value_b)| {
                let value_a = a.metrics.get(name).copied();
                let delta = value_a.map(|va| value_b - va);
                let percent = value_a.zip(delta).map(|(va, d)| {
                    if va != 0.0 {
                        d / va * 100.0
                    } else {
                        0.0
                    }
                });
                MetricDelta {
                    name: name.clone(),
                    value_a,
                    value_b,
                    delta,
                    percent,
                }
            })
            .collect();

        Self {
            version_a: a.version.clone(),
            version_b: b.version.clone(),
            metrics_a: a.metrics.clone(),
            metrics_b: b.metrics.clone(),
            deltas,
        }
    }

    pub fn delta(&self, metric: &str) -> Option<&MetricDelta> {
        self.deltas.iter().find(|d| d.name == metric)
    }

    /// Render the comparison for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = format!("Comparing {} vs {}:\n\n", self.version_a, self.version_b);

        out.push_str(&format!("{}:\n", self.version_a));
        for (name, value) in &self.metrics_a {
            out.push_str(&format!("  {name}: {value}\n"));
        }

        out.push_str(&format!("\n{}:\n", self.version_b));
        for d in &self.deltas {
            out.push_str(&format!("  {}: {}\n", d.name, d.value_b));
            if let (Some(delta), Some(percent)) = (d.delta, d.percent) {
                out.push_str(&format!(
                    "    Improvement: {delta:+.4} ({percent:+.2}%)\n"
                ));
            }
        }
        out
    }
}
