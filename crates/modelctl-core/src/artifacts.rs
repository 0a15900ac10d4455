//! Read-only view of the artifact store.
//!
//! Layout: `<root>/<version>/model.pth`, one directory per trained version.
//! Training writes these directories; the registry and deployer only check
//! for their presence and resolve paths inside them.

use std::path::{Component, Path, PathBuf};

use crate::domain::{ModelctlError, Result};

/// File name of the serialized model inside a version directory.
pub const MODEL_FILE_NAME: &str = "model.pth";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifact for `version`.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    /// Whether training has produced a directory for `version`.
    pub fn has_version(&self, version: &str) -> bool {
        check_version(version).is_ok() && self.version_dir(version).is_dir()
    }

    /// Path to the serialized model for `version`.
    pub fn model_file(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(MODEL_FILE_NAME)
    }
}

/// A version names exactly one directory directly under the store root.
///
/// Empty strings, separators, `.`/`..` and absolute paths are rejected.
pub fn check_version(version: &str) -> Result<()> {
    let mut components = Path::new(version).components();
    let single_segment = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_segment || version.contains(|c| c == '/' || c == '\\') {
        return Err(ModelctlError::InvalidVersion(version.to_string()));
    }
    Ok(())
}
