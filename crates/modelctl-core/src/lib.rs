//! modelctl Core Library
//!
//! Lifecycle management for trained classifier artifacts: a versioned
//! registry with a promotion state machine, a deployer that materializes
//! promoted versions at the serving location, and a production monitor
//! that aggregates outcome telemetry and raises threshold alerts.
//!
//! All state lives in files. Entry points construct one [`ModelRegistry`]
//! and one [`ProductionMonitor`] from a [`LifecycleConfig`] and pass them
//! to the operations that need them.

pub mod artifacts;
pub mod config;
pub mod deploy;
pub mod domain;
pub mod metrics;
pub mod monitor;
pub mod obs;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use artifacts::{check_version, ArtifactStore, MODEL_FILE_NAME};
pub use config::LifecycleConfig;
pub use deploy::{
    DeployOutcome, DeployReport, DeployTargets, Deployer, Environment, SERVED_FILE_NAME,
};
pub use domain::{
    Label, MetricsSnapshot, ModelStatus, ModelVersion, ModelctlError, Outcome, PredictionEvent,
    PredictionRecord, RegistrySnapshot, Result,
};
pub use monitor::{
    Alert, AlertKind, AlertThresholds, MonitorReport, ProductionMonitor, Severity, WindowSummary,
    REPORT_WINDOW_HOURS,
};
pub use registry::{MetricDelta, ModelComparison, ModelRegistry, RegistrySummary};

pub use metrics::COUNTERS;
pub use obs::{
    emit_alert_raised, emit_deploy_completed, emit_deploy_rejected, emit_model_displaced,
    emit_model_promoted, emit_model_registered, emit_prediction_logged, DeploySpan,
};
pub use telemetry::init_tracing;
