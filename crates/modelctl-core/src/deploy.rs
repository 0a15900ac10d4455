//! Deploy a registered version to a serving location.
//!
//! A deployment promotes the version in the registry and then copies its
//! artifact to the canonical served file for the environment
//! (`<staging_dir>/best_model.pth` or `<production_dir>/best_model.pth`).
//! Promotion happens before the copy. The serving process is not reloaded;
//! production deployments report that a manual restart is required.
//!
//! Expected operator mistakes come back as [`DeployOutcome::Rejected`]
//! rather than an error: an unknown environment, a missing artifact file,
//! or staging a version that is in production or archived. Registry errors
//! such as `VersionNotFound` propagate.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::config::LifecycleConfig;
use crate::domain::{ModelStatus, ModelctlError, Result};
use crate::metrics::COUNTERS;
use crate::obs;
use crate::registry::ModelRegistry;

/// File name the serving process loads from a target directory.
pub const SERVED_FILE_NAME: &str = "best_model.pth";

/// Deployment target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ModelctlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(ModelctlError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Serving directories per environment.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployTargets {
    pub staging_dir: PathBuf,
    pub production_dir: PathBuf,
}

impl DeployTargets {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            production_dir: config.production_dir.clone(),
        }
    }

    pub fn dir_for(&self, environment: Environment) -> &Path {
        match environment {
            Environment::Staging => &self.staging_dir,
            Environment::Production => &self.production_dir,
        }
    }

    /// Full path of the served file for `environment`.
    pub fn served_path(&self, environment: Environment) -> PathBuf {
        self.dir_for(environment).join(SERVED_FILE_NAME)
    }
}

/// What a successful deployment did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployReport {
    pub version: String,
    pub environment: Environment,
    pub source: PathBuf,
    pub target: PathBuf,
    /// Metrics recorded for the version at registration.
    pub metrics: BTreeMap<String, f64>,
    /// SHA-256 hex of the bytes written to `target`.
    pub artifact_sha256: String,
    /// The serving process must be restarted to pick up the new file.
    pub restart_required: bool,
}

/// Result of a deploy request at the operator boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    Deployed(DeployReport),
    /// Refused before touching the registry or the serving location.
    Rejected { version: String, reason: String },
}

impl DeployOutcome {
    pub fn success(&self) -> bool {
        matches!(self, DeployOutcome::Deployed(_))
    }

    pub fn report(&self) -> Option<&DeployReport> {
        match self {
            DeployOutcome::Deployed(report) => Some(report),
            DeployOutcome::Rejected { .. } => None,
        }
    }

    pub fn render_text(&self) -> String {
        match self {
            DeployOutcome::Deployed(r) => {
                let metrics = r
                    .metrics
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut out = format!("Model {} deployed to {}\n", r.version, r.environment);
                out.push_str(&format!("  Source: {}\n", r.source.display()));
                out.push_str(&format!("  Target: {}\n", r.target.display()));
                out.push_str(&format!("  SHA-256: {}\n", r.artifact_sha256));
                out.push_str(&format!(
                    "  Metrics: {}\n",
                    if metrics.is_empty() { "-" } else { metrics.as_str() }
                ));
                if r.restart_required {
                    out.push_str("\nRestart the serving process to load the new model.\n");
                }
                out
            }
            DeployOutcome::Rejected { version, reason } => {
                format!("Deploy of {version} rejected: {reason}\n")
            }
        }
    }
}

/// Promotes and materializes versions on behalf of an operator.
pub struct Deployer<'a> {
    registry: &'a ModelRegistry,
    targets: DeployTargets,
}

impl<'a> Deployer<'a> {
    pub fn new(registry: &'a ModelRegistry, targets: DeployTargets) -> Self {
        Self { registry, targets }
    }

    /// Deploy `version` to an environment given by name.
    ///
    /// An unknown environment is rejected before the registry is consulted.
    pub fn deploy(&self, version: &str, environment: &str) -> Result<DeployOutcome> {
        match environment.parse::<Environment>() {
            Ok(env) => self.deploy_to(version, env),
            Err(err) => Ok(self.reject(version, err.to_string())),
        }
    }

    /// Deploy `version` to `environment`.
    pub fn deploy_to(&self, version: &str, environment: Environment) -> Result<DeployOutcome> {
        let _span = obs::DeploySpan::enter(version, environment.as_str());

        let model = self.registry.get_model(version)?;
        if environment == Environment::Staging
            && matches!(model.status, ModelStatus::Production | ModelStatus::Archived)
        {
            return Ok(self.reject(
                version,
                format!("cannot stage a {} version", model.status),
            ));
        }

        let source = self.registry.artifacts().model_file(version);
        if !source.is_file() {
            return Ok(self.reject(
                version,
                format!("model file not found: {}", source.display()),
            ));
        }

        match environment {
            Environment::Staging => self.registry.promote_to_staging(version)?,
            Environment::Production => self.registry.promote_to_production(version)?,
        }

        let target = self.targets.served_path(environment);
        let artifact_sha256 = copy_with_digest(&source, &target)?;

        COUNTERS.inc_deployments();
        obs::emit_deploy_completed(version, environment.as_str(), &target);

        Ok(DeployOutcome::Deployed(DeployReport {
            version: model.version,
            environment,
            source,
            target,
            metrics: model.metrics,
            artifact_sha256,
            restart_required: environment == Environment::Production,
        }))
    }

    /// Put `to_version` back into production.
    ///
    /// Same path as a production deploy: whatever is in production now is
    /// archived and `to_version` is re-promoted, even if it was archived.
    pub fn rollback(&self, to_version: &str) -> Result<DeployOutcome> {
        tracing::info!(event = "deploy.rollback", version = %to_version);
        self.deploy_to(to_version, Environment::Production)
    }

    fn reject(&self, version: &str, reason: String) -> DeployOutcome {
        obs::emit_deploy_rejected(version, &reason);
        DeployOutcome::Rejected {
            version: version.to_string(),
            reason,
        }
    }
}

/// Copy `src` over `dst` via a temp file in the destination directory and
/// return the SHA-256 hex of the copied bytes.
fn copy_with_digest(src: &Path, dst: &Path) -> Result<String> {
    let dir = dst
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut input = File::open(src)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        tmp.write_all(&buf[..n])?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dst)?;

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_names_only() {
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!(matches!(
            "prod".parse::<Environment>(),
            Err(ModelctlError::InvalidEnvironment(e)) if e == "prod"
        ));
    }

    #[test]
    fn served_paths_are_distinct_per_environment() {
        let targets = DeployTargets {
            staging_dir: PathBuf::from("weights/staging"),
            production_dir: PathBuf::from("weights"),
        };
        assert_eq!(
            targets.served_path(Environment::Staging),
            PathBuf::from("weights/staging/best_model.pth")
        );
        assert_eq!(
            targets.served_path(Environment::Production),
            PathBuf::from("weights/best_model.pth")
        );
    }

    #[test]
    fn copy_with_digest_overwrites_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("model.pth");
        let dst = dir.path().join("out").join(SERVED_FILE_NAME);
        fs::write(&src, b"weights-v2").unwrap();
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        fs::write(&dst, b"weights-v1-old-and-longer").unwrap();

        let digest = copy_with_digest(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"weights-v2");
        assert_eq!(digest, hex::encode(Sha256::digest(b"weights-v2")));
    }

    #[test]
    fn rejected_outcome_is_not_success() {
        let outcome = DeployOutcome::Rejected {
            version: "v1".to_string(),
            reason: "model file not found".to_string(),
        };
        assert!(!outcome.success());
        assert!(outcome.report().is_none());
        assert!(outcome.render_text().contains("rejected"));
    }
}
