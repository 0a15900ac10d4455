//! Domain-level error taxonomy for the model lifecycle manager.

use std::path::PathBuf;

use crate::domain::model::ModelStatus;

/// Lifecycle errors raised by the registry, deployer, and monitor.
#[derive(Debug, thiserror::Error)]
pub enum ModelctlError {
    #[error("artifact not found for version {version}: {path:?}")]
    ArtifactNotFound { version: String, path: PathBuf },

    #[error("model version not found: {0}")]
    VersionNotFound(String),

    #[error("no production model set")]
    NoProductionModel,

    #[error("model version already registered: {0}")]
    DuplicateVersion(String),

    #[error("invalid model version {0:?}: must be a single path segment")]
    InvalidVersion(String),

    #[error("non-finite value for {field}")]
    NonFinite { field: String },

    #[error("invalid transition for {version}: {from} -> {to}")]
    InvalidTransition {
        version: String,
        from: ModelStatus,
        to: ModelStatus,
    },

    #[error("invalid environment: {0} (expected staging or production)")]
    InvalidEnvironment(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corrupt record at {path:?} line {line}: {source}")]
    RecordCorrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("atomic write failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, ModelctlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_errors_display() {
        let err = ModelctlError::VersionNotFound("v9".to_string());
        assert!(err.to_string().contains("model version not found"));
        assert!(err.to_string().contains("v9"));

        let err = ModelctlError::NoProductionModel;
        assert_eq!(err.to_string(), "no production model set");
    }

    #[test]
    fn test_artifact_not_found_names_path() {
        let err = ModelctlError::ArtifactNotFound {
            version: "v1".to_string(),
            path: PathBuf::from("mlops/registry/models/v1"),
        };
        let msg = err.to_string();
        assert!(msg.contains("v1"));
        assert!(msg.contains("mlops/registry/models/v1"));
    }

    #[test]
    fn test_input_errors_display() {
        let err = ModelctlError::InvalidVersion("../x".to_string());
        assert!(err.to_string().contains("\"../x\""));

        let err = ModelctlError::NonFinite {
            field: "confidence".to_string(),
        };
        assert_eq!(err.to_string(), "non-finite value for confidence");
    }

    #[test]
    fn test_invalid_transition_names_statuses() {
        let err = ModelctlError::InvalidTransition {
            version: "v2".to_string(),
            from: ModelStatus::Archived,
            to: ModelStatus::Staging,
        };
        let msg = err.to_string();
        assert!(msg.contains("archived"));
        assert!(msg.contains("staging"));
    }
}
