//! File-backed model registry.
//!
//! The registry is the single source of truth for version metadata and
//! promotion status. It persists to `<registry_dir>/registry.json` and
//! reads artifact presence from `<registry_dir>/models/`.
//!
//! Every operation re-reads the snapshot from disk. Mutations run under an
//! exclusive lock on `registry.lock`, apply the change in memory, and
//! replace the snapshot file atomically, so two operators promoting at the
//! same time serialize instead of losing an update.

mod comparison;

pub use comparison::{MetricDelta, ModelComparison};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifacts::{self, ArtifactStore};
use crate::config::LifecycleConfig;
use crate::domain::{ModelStatus, ModelVersion, ModelctlError, RegistrySnapshot, Result};
use crate::metrics::COUNTERS;
use crate::obs;
use crate::store;

const SNAPSHOT_FILE: &str = "registry.json";
const LOCK_FILE: &str = "registry.lock";
const MODELS_DIR: &str = "models";

/// Headline view of the registry for operator summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub production_version: Option<String>,
    pub staging_version: Option<String>,
    pub model_count: usize,
}

pub struct ModelRegistry {
    root: PathBuf,
    artifacts: ArtifactStore,
    snapshot_path: PathBuf,
    lock_path: PathBuf,
}

impl ModelRegistry {
    /// Open the registry rooted at `registry_dir`, creating the directory
    /// tree on first use.
    pub fn open(registry_dir: impl AsRef<Path>) -> Result<Self> {
        let root = registry_dir.as_ref().to_path_buf();
        let artifacts = ArtifactStore::new(root.join(MODELS_DIR));
        fs::create_dir_all(artifacts.root())?;

        Ok(Self {
            snapshot_path: root.join(SNAPSHOT_FILE),
            lock_path: root.join(LOCK_FILE),
            artifacts,
            root,
        })
    }

    pub fn from_config(config: &LifecycleConfig) -> Result<Self> {
        Self::open(&config.registry_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Current persisted snapshot.
    pub fn snapshot(&self) -> Result<RegistrySnapshot> {
        store::read_json_or_default(&self.snapshot_path)
    }

    /// Locked read-modify-write. Nothing is written if `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut RegistrySnapshot) -> Result<T>) -> Result<T> {
        store::with_exclusive(&self.lock_path, || {
            let mut snapshot = self.snapshot()?;
            let out = f(&mut snapshot)?;
            store::write_json_atomic(&self.snapshot_path, &snapshot)?;
            Ok(out)
        })
    }

    /// Register a freshly trained version.
    ///
    /// Fails with `InvalidVersion` unless `version` is a single path
    /// segment, with `NonFinite` for a NaN or infinite metric, with
    /// `ArtifactNotFound` unless training already produced
    /// `models/<version>/`, and with `DuplicateVersion` if the version is
    /// already registered.
    pub fn register(
        &self,
        version: &str,
        metrics: BTreeMap<String, f64>,
        description: Option<&str>,
    ) -> Result<ModelVersion> {
        self.register_at(version, metrics, description, Utc::now())
    }

    /// [`ModelRegistry::register`] with an explicit registration time.
    pub fn register_at(
        &self,
        version: &str,
        metrics: BTreeMap<String, f64>,
        description: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<ModelVersion> {
        artifacts::check_version(version)?;
        if let Some((name, _)) = metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ModelctlError::NonFinite {
                field: format!("metric {name}"),
            });
        }

        let artifact_dir = self.artifacts.version_dir(version);
        if !self.artifacts.has_version(version) {
            return Err(ModelctlError::ArtifactNotFound {
                version: version.to_string(),
                path: artifact_dir,
            });
        }

        let model = ModelVersion::new(
            version,
            metrics,
            description.map(ToString::to_string),
            artifact_dir,
            timestamp,
        );

        let stored = model.clone();
        self.mutate(move |snapshot| snapshot.push(stored))?;

        COUNTERS.inc_registrations();
        obs::emit_model_registered(&model.version, model.metrics.len());
        Ok(model)
    }

    pub fn get_model(&self, version: &str) -> Result<ModelVersion> {
        self.snapshot()?
            .get(version)
            .cloned()
            .ok_or_else(|| ModelctlError::VersionNotFound(version.to_string()))
    }

    /// All versions in registration order.
    pub fn list_models(&self) -> Result<Vec<ModelVersion>> {
        Ok(self.snapshot()?.models)
    }

    /// Make `version` the staging candidate. The previous staging version,
    /// if any, reverts to `registered`.
    pub fn promote_to_staging(&self, version: &str) -> Result<()> {
        let displaced = self.mutate(|snapshot| snapshot.promote_to_staging(version))?;

        COUNTERS.inc_promotions();
        obs::emit_model_promoted(version, ModelStatus::Staging);
        if let Some(old) = displaced {
            obs::emit_model_displaced(&old, ModelStatus::Registered);
        }
        Ok(())
    }

    /// Make `version` the production model. The previous production
    /// version, if any, is archived.
    pub fn promote_to_production(&self, version: &str) -> Result<()> {
        let displaced = self.mutate(|snapshot| snapshot.promote_to_production(version))?;

        COUNTERS.inc_promotions();
        obs::emit_model_promoted(version, ModelStatus::Production);
        if let Some(old) = displaced {
            obs::emit_model_displaced(&old, ModelStatus::Archived);
        }
        Ok(())
    }

    /// Compare the metrics of `version_b` against baseline `version_a`.
    pub fn compare_models(&self, version_a: &str, version_b: &str) -> Result<ModelComparison> {
        let snapshot = self.snapshot()?;
        let a = snapshot
            .get(version_a)
            .ok_or_else(|| ModelctlError::VersionNotFound(version_a.to_string()))?;
        let b = snapshot
            .get(version_b)
            .ok_or_else(|| ModelctlError::VersionNotFound(version_b.to_string()))?;
        Ok(ModelComparison::between(a, b))
    }

    pub fn production_model(&self) -> Result<ModelVersion> {
        let snapshot = self.snapshot()?;
        let version = snapshot
            .production_version
            .as_deref()
            .ok_or(ModelctlError::NoProductionModel)?;
        snapshot
            .get(version)
            .cloned()
            .ok_or_else(|| ModelctlError::VersionNotFound(version.to_string()))
    }

    pub fn staging_model(&self) -> Result<Option<ModelVersion>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .staging_version
            .as_deref()
            .and_then(|v| snapshot.get(v))
            .cloned())
    }

    pub fn summary(&self) -> Result<RegistrySummary> {
        let snapshot = self.snapshot()?;
        Ok(RegistrySummary {
            model_count: snapshot.models.len(),
            production_version: snapshot.production_version,
            staging_version: snapshot.staging_version,
        })
    }
}
