//! Filesystem layout and alert thresholds.
//!
//! Defaults mirror the layout the training and serving scripts expect:
//!
//! ```text
//! mlops/registry/registry.json        registry snapshot
//! mlops/registry/models/<version>/    artifact store
//! mlops/monitoring/logs/              outcome log, metrics, alerts
//! weights/staging/best_model.pth      staging serving path
//! weights/best_model.pth              production serving path
//! ```

use std::path::{Path, PathBuf};

use crate::domain::{ModelctlError, Result};
use crate::monitor::AlertThresholds;

pub const DEFAULT_REGISTRY_DIR: &str = "mlops/registry";
pub const DEFAULT_MONITOR_DIR: &str = "mlops/monitoring/logs";
pub const DEFAULT_STAGING_DIR: &str = "weights/staging";
pub const DEFAULT_PRODUCTION_DIR: &str = "weights";

/// Where every persisted resource lives, plus monitor alert rules.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub registry_dir: PathBuf,
    pub monitor_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub production_dir: PathBuf,
    pub alert_thresholds: AlertThresholds,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            monitor_dir: PathBuf::from(DEFAULT_MONITOR_DIR),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            production_dir: PathBuf::from(DEFAULT_PRODUCTION_DIR),
            alert_thresholds: AlertThresholds::default(),
        }
    }
}

impl LifecycleConfig {
    /// All resources under one root directory. Handy for tests and sandboxes.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            registry_dir: root.join(DEFAULT_REGISTRY_DIR),
            monitor_dir: root.join(DEFAULT_MONITOR_DIR),
            staging_dir: root.join(DEFAULT_STAGING_DIR),
            production_dir: root.join(DEFAULT_PRODUCTION_DIR),
            alert_thresholds: AlertThresholds::default(),
        }
    }

    /// Create from environment variables
    ///
    /// Reads (all optional, defaults as in [`LifecycleConfig::default`]):
    /// - MODELCTL_REGISTRY_DIR
    /// - MODELCTL_MONITOR_DIR
    /// - MODELCTL_STAGING_DIR
    /// - MODELCTL_PRODUCTION_DIR
    /// - MODELCTL_MAX_ERROR_RATE (fraction, e.g. `0.01`)
    /// - MODELCTL_MAX_LATENCY_MS
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LifecycleConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("MODELCTL_REGISTRY_DIR") {
            config.registry_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODELCTL_MONITOR_DIR") {
            config.monitor_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODELCTL_STAGING_DIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODELCTL_PRODUCTION_DIR") {
            config.production_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("MODELCTL_MAX_ERROR_RATE") {
            config.alert_thresholds.max_error_rate = parse_f64("MODELCTL_MAX_ERROR_RATE", &raw)?;
        }
        if let Some(raw) = lookup("MODELCTL_MAX_LATENCY_MS") {
            config.alert_thresholds.max_avg_latency_ms =
                parse_f64("MODELCTL_MAX_LATENCY_MS", &raw)?;
        }

        Ok(config)
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    pub fn with_monitor_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.monitor_dir = dir.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_production_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.production_dir = dir.into();
        self
    }

    pub fn with_alert_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ModelctlError::InvalidConfig(format!("{key}={raw:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = LifecycleConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config, LifecycleConfig::default());
        assert_eq!(config.production_dir, PathBuf::from("weights"));
    }

    #[test]
    fn test_env_overrides_paths_and_thresholds() {
        let config = LifecycleConfig::from_lookup(lookup_from(&[
            ("MODELCTL_REGISTRY_DIR", "/srv/registry"),
            ("MODELCTL_STAGING_DIR", "/srv/weights/staging"),
            ("MODELCTL_MAX_ERROR_RATE", "0.05"),
            ("MODELCTL_MAX_LATENCY_MS", " 250 "),
        ]))
        .expect("config");

        assert_eq!(config.registry_dir, PathBuf::from("/srv/registry"));
        assert_eq!(config.staging_dir, PathBuf::from("/srv/weights/staging"));
        assert_eq!(config.monitor_dir, PathBuf::from(DEFAULT_MONITOR_DIR));
        assert_eq!(config.alert_thresholds.max_error_rate, 0.05);
        assert_eq!(config.alert_thresholds.max_avg_latency_ms, 250.0);
    }

    #[test]
    fn test_bad_threshold_is_rejected() {
        let err = LifecycleConfig::from_lookup(lookup_from(&[("MODELCTL_MAX_LATENCY_MS", "fast")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelctlError::InvalidConfig(msg) if msg.contains("MODELCTL_MAX_LATENCY_MS")
        ));
    }

    #[test]
    fn test_rooted_at_nests_every_path() {
        let config = LifecycleConfig::rooted_at("/tmp/sandbox");
        assert!(config.registry_dir.starts_with("/tmp/sandbox"));
        assert!(config.monitor_dir.starts_with("/tmp/sandbox"));
        assert_eq!(
            config.production_dir,
            PathBuf::from("/tmp/sandbox/weights")
        );
    }
}
