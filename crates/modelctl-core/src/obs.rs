//! Structured observability hooks for lifecycle events.
//!
//! Registry, deployer, and monitor call these at the point a change
//! becomes durable. Events are emitted at `info!` unless noted.

use tracing::{debug, info, warn};

use crate::domain::ModelStatus;

/// RAII guard that enters a deployment-scoped span.
pub struct DeploySpan {
    _span: tracing::span::EnteredSpan,
}

impl DeploySpan {
    pub fn enter(version: &str, environment: &str) -> Self {
        let span = tracing::info_span!(
            "modelctl.deploy",
            version = %version,
            environment = %environment
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a new version was appended to the registry.
pub fn emit_model_registered(version: &str, metric_count: usize) {
    info!(event = "model.registered", version = %version, metric_count = metric_count);
}

/// Emit event: a version moved into `staging` or `production`.
pub fn emit_model_promoted(version: &str, to: ModelStatus) {
    info!(event = "model.promoted", version = %version, to = %to);
}

/// Emit event: a version lost its slot to a newer promotion.
pub fn emit_model_displaced(version: &str, to: ModelStatus) {
    info!(event = "model.displaced", version = %version, to = %to);
}

/// Emit event: artifact copied to the serving location.
pub fn emit_deploy_completed(version: &str, environment: &str, target: &std::path::Path) {
    info!(
        event = "deploy.completed",
        version = %version,
        environment = %environment,
        target = %target.display(),
    );
}

/// Emit event: deployment refused before any change (warning level).
pub fn emit_deploy_rejected(version: &str, reason: &str) {
    warn!(event = "deploy.rejected", version = %version, reason = %reason);
}

/// Emit event: one outcome ingested (debug level; fires per request).
pub fn emit_prediction_logged(model_version: &str, is_error: bool, total: u64) {
    debug!(
        event = "prediction.logged",
        model_version = %model_version,
        is_error = is_error,
        total_predictions = total,
    );
}

/// Emit event: an alert rule fired (warning level).
pub fn emit_alert_raised(kind: &str, message: &str) {
    warn!(event = "alert.raised", kind = %kind, message = %message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_span_create() {
        let _span = DeploySpan::enter("v1", "staging");
    }
}
