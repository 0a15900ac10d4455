use std::collections::BTreeMap;
use std::fs;

use chrono::{DateTime, Utc};
use modelctl_core::{ModelRegistry, ModelStatus, ModelctlError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .expect("parse timestamp")
        .with_timezone(&Utc)
}

fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Open a registry in a temp dir with artifact directories for `versions`
/// and register each of them.
fn setup_registry(versions: &[&str]) -> (tempfile::TempDir, ModelRegistry) {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = ModelRegistry::open(dir.path().join("mlops/registry")).expect("open");
    for v in versions {
        fs::create_dir_all(registry.artifacts().version_dir(v)).expect("artifact dir");
        registry
            .register(v, metrics(&[("acc", 0.5)]), None)
            .expect("register");
    }
    (dir, registry)
}

fn status_of(registry: &ModelRegistry, version: &str) -> ModelStatus {
    registry.get_model(version).expect("get_model").status
}

fn count_with(registry: &ModelRegistry, status: ModelStatus) -> usize {
    registry
        .list_models()
        .expect("list")
        .iter()
        .filter(|m| m.status == status)
        .count()
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn register_then_list_yields_registered_record() {
    let (_dir, registry) = setup_registry(&[]);
    fs::create_dir_all(registry.artifacts().version_dir("v1")).unwrap();

    let created = registry
        .register_at(
            "v1",
            metrics(&[("acc", 0.9)]),
            Some("baseline"),
            fixed_timestamp(),
        )
        .expect("register");
    assert_eq!(created.timestamp, fixed_timestamp());

    let models = registry.list_models().expect("list");
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].version, "v1");
    assert_eq!(models[0].status, ModelStatus::Registered);
    assert_eq!(models[0].metrics.get("acc"), Some(&0.9));
    assert_eq!(models[0].description.as_deref(), Some("baseline"));
    assert_eq!(
        models[0].artifact_path,
        registry.artifacts().version_dir("v1")
    );
}

#[test]
fn list_preserves_registration_order() {
    let (_dir, registry) = setup_registry(&["v3", "v1", "v2"]);
    let order: Vec<String> = registry
        .list_models()
        .unwrap()
        .into_iter()
        .map(|m| m.version)
        .collect();
    assert_eq!(order, vec!["v3", "v1", "v2"]);
}

#[test]
fn register_without_artifact_fails() {
    let (_dir, registry) = setup_registry(&[]);
    let err = registry
        .register("v-missing", metrics(&[]), None)
        .unwrap_err();
    assert!(matches!(err, ModelctlError::ArtifactNotFound { .. }));
}

#[test]
fn duplicate_registration_is_rejected() {
    let (_dir, registry) = setup_registry(&["v1"]);
    let err = registry
        .register("v1", metrics(&[("acc", 0.99)]), None)
        .unwrap_err();
    assert!(matches!(err, ModelctlError::DuplicateVersion(v) if v == "v1"));

    let models = registry.list_models().unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].metrics.get("acc"), Some(&0.5));
}

#[test]
fn version_outside_artifact_store_is_rejected() {
    let (dir, registry) = setup_registry(&[]);
    let outside = dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();

    let candidates = [
        String::new(),
        "../x".to_string(),
        "../../outside".to_string(),
        outside.to_string_lossy().into_owned(),
    ];
    for version in &candidates {
        let err = registry.register(version, metrics(&[]), None).unwrap_err();
        assert!(
            matches!(err, ModelctlError::InvalidVersion(ref v) if v == version),
            "{version:?} gave {err:?}"
        );
    }
    assert!(registry.list_models().unwrap().is_empty());
}

#[test]
fn non_finite_metric_is_rejected() {
    let (_dir, registry) = setup_registry(&[]);
    fs::create_dir_all(registry.artifacts().version_dir("v1")).unwrap();

    let err = registry
        .register("v1", metrics(&[("acc", 0.9), ("loss", f64::NAN)]), None)
        .unwrap_err();
    assert!(matches!(err, ModelctlError::NonFinite { ref field } if field.contains("loss")));
    assert!(registry.list_models().unwrap().is_empty());

    // The snapshot stays readable and the version can still be registered.
    registry.register("v1", metrics(&[("acc", 0.9)]), None).unwrap();
    assert_eq!(registry.list_models().unwrap().len(), 1);
}

#[test]
fn get_unknown_version_fails() {
    let (_dir, registry) = setup_registry(&["v1"]);
    assert!(matches!(
        registry.get_model("v2"),
        Err(ModelctlError::VersionNotFound(v)) if v == "v2"
    ));
}

// ---------------------------------------------------------------------------
// Promotion state machine
// ---------------------------------------------------------------------------

#[test]
fn second_staging_promotion_reverts_first_to_registered() {
    let (_dir, registry) = setup_registry(&["v1", "v2"]);
    registry.promote_to_staging("v1").expect("stage v1");
    registry.promote_to_staging("v2").expect("stage v2");

    assert_eq!(status_of(&registry, "v1"), ModelStatus::Registered);
    assert_eq!(status_of(&registry, "v2"), ModelStatus::Staging);
    assert_eq!(
        registry.summary().unwrap().staging_version.as_deref(),
        Some("v2")
    );
    assert_eq!(count_with(&registry, ModelStatus::Staging), 1);
}

#[test]
fn second_production_promotion_archives_first() {
    let (_dir, registry) = setup_registry(&["v1", "v2"]);
    registry.promote_to_production("v1").expect("prod v1");
    registry.promote_to_production("v2").expect("prod v2");

    assert_eq!(status_of(&registry, "v1"), ModelStatus::Archived);
    assert_eq!(status_of(&registry, "v2"), ModelStatus::Production);
    assert_eq!(registry.production_model().unwrap().version, "v2");
    assert_eq!(count_with(&registry, ModelStatus::Production), 1);
}

#[test]
fn production_model_before_any_promotion_fails() {
    let (_dir, registry) = setup_registry(&["v1"]);
    assert!(matches!(
        registry.production_model(),
        Err(ModelctlError::NoProductionModel)
    ));
}

#[test]
fn staged_version_promoted_to_production_leaves_no_staging() {
    let (_dir, registry) = setup_registry(&["v1"]);
    registry.promote_to_staging("v1").unwrap();
    registry.promote_to_production("v1").unwrap();

    let summary = registry.summary().unwrap();
    assert_eq!(summary.staging_version, None);
    assert_eq!(summary.production_version.as_deref(), Some("v1"));
    assert_eq!(count_with(&registry, ModelStatus::Staging), 0);
}

#[test]
fn archived_version_cannot_return_to_staging() {
    let (_dir, registry) = setup_registry(&["v1", "v2"]);
    registry.promote_to_production("v1").unwrap();
    registry.promote_to_production("v2").unwrap();

    let err = registry.promote_to_staging("v1").unwrap_err();
    assert!(matches!(
        err,
        ModelctlError::InvalidTransition {
            from: ModelStatus::Archived,
            to: ModelStatus::Staging,
            ..
        }
    ));
    assert_eq!(status_of(&registry, "v1"), ModelStatus::Archived);
}

#[test]
fn promoting_unknown_version_fails_without_change() {
    let (_dir, registry) = setup_registry(&["v1"]);
    registry.promote_to_staging("v1").unwrap();
    assert!(matches!(
        registry.promote_to_staging("ghost"),
        Err(ModelctlError::VersionNotFound(_))
    ));
    assert_eq!(status_of(&registry, "v1"), ModelStatus::Staging);
}

#[test]
fn promotions_survive_reopen() {
    let (dir, registry) = setup_registry(&["v1", "v2"]);
    registry.promote_to_production("v1").unwrap();
    registry.promote_to_staging("v2").unwrap();
    drop(registry);

    let reopened = ModelRegistry::open(dir.path().join("mlops/registry")).unwrap();
    assert_eq!(reopened.production_model().unwrap().version, "v1");
    assert_eq!(
        reopened.staging_model().unwrap().map(|m| m.version).as_deref(),
        Some("v2")
    );
}

#[test]
fn snapshot_file_is_human_readable_json() {
    let (_dir, registry) = setup_registry(&["v1"]);
    registry.promote_to_production("v1").unwrap();

    let raw = fs::read_to_string(registry.root().join("registry.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["production_version"], "v1");
    assert_eq!(value["staging_version"], serde_json::Value::Null);
    assert_eq!(value["models"][0]["status"], "production");
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[test]
fn compare_with_zero_baseline_reports_zero_percent() {
    let (_dir, registry) = setup_registry(&[]);
    for (v, value) in [("v1", 0.0), ("v2", 5.0)] {
        fs::create_dir_all(registry.artifacts().version_dir(v)).unwrap();
        registry
            .register(v, metrics(&[("recall", value)]), None)
            .unwrap();
    }

    let cmp = registry.compare_models("v1", "v2").expect("compare");
    let recall = cmp.delta("recall").expect("recall delta");
    assert_eq!(recall.delta, Some(5.0));
    assert_eq!(recall.percent, Some(0.0));
}

#[test]
fn compare_does_not_mutate_registry() {
    let (_dir, registry) = setup_registry(&["v1", "v2"]);
    let before = fs::read(registry.root().join("registry.json")).unwrap();
    registry.compare_models("v1", "v2").unwrap();
    let after = fs::read(registry.root().join("registry.json")).unwrap();
    assert_eq!(before, after);
}

// ---------------------------------------------------------------------------
// Concurrent writers
// ---------------------------------------------------------------------------

#[test]
fn concurrent_registrations_are_all_kept() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let dir = tempfile::tempdir().unwrap();
    let registry_dir = dir.path().join("mlops/registry");
    let registry = ModelRegistry::open(&registry_dir).unwrap();
    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            fs::create_dir_all(registry.artifacts().version_dir(&format!("t{t}-v{i}"))).unwrap();
        }
    }

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let registry_dir = &registry_dir;
            scope.spawn(move || {
                let registry = ModelRegistry::open(registry_dir).unwrap();
                for i in 0..PER_THREAD {
                    registry
                        .register(&format!("t{t}-v{i}"), metrics(&[("acc", 0.5)]), None)
                        .unwrap();
                }
            });
        }
    });

    let models = registry.list_models().unwrap();
    assert_eq!(models.len(), THREADS * PER_THREAD);
    let mut versions: Vec<String> = models.into_iter().map(|m| m.version).collect();
    versions.sort();
    versions.dedup();
    assert_eq!(versions.len(), THREADS * PER_THREAD);
}
