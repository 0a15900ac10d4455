//! Model versions and the persisted registry snapshot.
//!
//! [`RegistrySnapshot`] owns the promotion state machine. The transition
//! methods are crate-private so that status changes only happen through
//! [`crate::registry::ModelRegistry`], which wraps each one in a locked
//! read-modify-write cycle.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelctlError, Result};

/// Promotion status of a registered model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Registered,
    Staging,
    Production,
    Archived,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Registered => "registered",
            ModelStatus::Staging => "staging",
            ModelStatus::Production => "production",
            ModelStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trained artifact and its recorded metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelVersion {
    /// Caller-supplied unique identifier (e.g. `v1.2.0`).
    pub version: String,

    /// When the version was registered.
    pub timestamp: DateTime<Utc>,

    /// Training/eval metrics recorded at registration.
    pub metrics: BTreeMap<String, f64>,

    /// Free-text notes.
    #[serde(default)]
    pub description: Option<String>,

    /// Current promotion status.
    pub status: ModelStatus,

    /// Artifact directory inside the artifact store.
    pub artifact_path: PathBuf,
}

impl ModelVersion {
    /// Create a freshly registered version.
    pub fn new(
        version: impl Into<String>,
        metrics: BTreeMap<String, f64>,
        description: Option<String>,
        artifact_path: PathBuf,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            version: version.into(),
            timestamp,
            metrics,
            description,
            status: ModelStatus::Registered,
            artifact_path,
        }
    }
}

/// The whole registry as persisted to `registry.json`.
///
/// # Invariants
///
/// - At most one entry has status `production`, and it is `production_version`.
/// - At most one entry has status `staging`, and it is `staging_version`.
/// - `version` values are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrySnapshot {
    /// Entries in registration order.
    pub models: Vec<ModelVersion>,
    pub production_version: Option<String>,
    pub staging_version: Option<String>,
}

impl RegistrySnapshot {
    pub fn get(&self, version: &str) -> Option<&ModelVersion> {
        self.models.iter().find(|m| m.version == version)
    }

    fn get_mut(&mut self, version: &str) -> Result<&mut ModelVersion> {
        self.models
            .iter_mut()
            .find(|m| m.version == version)
            .ok_or_else(|| ModelctlError::VersionNotFound(version.to_string()))
    }

    fn status_of(&self, version: &str) -> Result<ModelStatus> {
        self.get(version)
            .map(|m| m.status)
            .ok_or_else(|| ModelctlError::VersionNotFound(version.to_string()))
    }

    pub(crate) fn push(&mut self, model: ModelVersion) -> Result<()> {
        if self.get(&model.version).is_some() {
            return Err(ModelctlError::DuplicateVersion(model.version));
        }
        self.models.push(model);
        Ok(())
    }

    /// Move `version` into staging. Returns the version it displaced, which
    /// goes back to `registered`.
    ///
    /// The production version and archived versions cannot be staged.
    pub(crate) fn promote_to_staging(&mut self, version: &str) -> Result<Option<String>> {
        let from = self.status_of(version)?;
        if matches!(from, ModelStatus::Production | ModelStatus::Archived) {
            return Err(ModelctlError::InvalidTransition {
                version: version.to_string(),
                from,
                to: ModelStatus::Staging,
            });
        }

        let displaced = self
            .staging_version
            .replace(version.to_string())
            .filter(|old| old != version);

        if let Some(old) = &displaced {
            if let Ok(m) = self.get_mut(old) {
                m.status = ModelStatus::Registered;
            }
        }
        self.get_mut(version)?.status = ModelStatus::Staging;
        Ok(displaced)
    }

    /// Move `version` into production. Returns the version it displaced,
    /// which is archived.
    ///
    /// Archived versions may be re-promoted; that is how rollback works.
    pub(crate) fn promote_to_production(&mut self, version: &str) -> Result<Option<String>> {
        let from = self.status_of(version)?;

        let displaced = self
            .production_version
            .replace(version.to_string())
            .filter(|old| old != version);

        if let Some(old) = &displaced {
            if let Ok(m) = self.get_mut(old) {
                m.status = ModelStatus::Archived;
            }
        }
        if from == ModelStatus::Staging && self.staging_version.as_deref() == Some(version) {
            self.staging_version = None;
        }
        self.get_mut(version)?.status = ModelStatus::Production;
        Ok(displaced)
    }
}
