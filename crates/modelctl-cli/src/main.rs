//! modelctl - Model Lifecycle Manager CLI
//!
//! The `modelctl` command drives the registry, the deployer, and the
//! production monitor from the shell.
//!
//! ## Commands
//!
//! - `deploy`: Copy a registered version to the staging or production path
//! - `registry`: Register, inspect, promote, and compare model versions
//! - `monitor`: Log outcomes, inspect recent traffic, and evaluate alerts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use modelctl_core::{
    DeployTargets, Deployer, Label, LifecycleConfig, ModelRegistry, ModelVersion,
    PredictionEvent, ProductionMonitor, COUNTERS,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "modelctl")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Model lifecycle manager: registry, deployment, and monitoring",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Registry directory (overrides MODELCTL_REGISTRY_DIR)
    #[arg(long, global = true)]
    registry_dir: Option<PathBuf>,

    /// Monitor directory (overrides MODELCTL_MONITOR_DIR)
    #[arg(long, global = true)]
    monitor_dir: Option<PathBuf>,

    /// Staging serving directory (overrides MODELCTL_STAGING_DIR)
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    /// Production serving directory (overrides MODELCTL_PRODUCTION_DIR)
    #[arg(long, global = true)]
    production_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a registered version to a serving environment
    Deploy {
        /// Version to deploy
        #[arg(long)]
        version: String,

        /// Target environment (staging or production)
        #[arg(long, default_value = "staging")]
        env: String,

        /// Roll production back to the given version
        #[arg(long)]
        rollback: bool,
    },

    /// Model registry operations
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Production monitoring operations
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Show production and staging versions and the model count
    Summary,

    /// List all registered versions in registration order
    List,

    /// Show one version's record as JSON
    Show {
        /// Version to show
        version: String,
    },

    /// Register a version whose artifacts already exist under models/<version>/
    Register {
        /// Version identifier
        #[arg(long)]
        version: String,

        /// Evaluation metric as name=value (repeatable)
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, f64)>,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,
    },

    /// Promote a version to staging or production
    Promote {
        /// Version to promote
        version: String,

        /// Target status
        #[arg(long, value_enum)]
        to: PromoteTarget,
    },

    /// Compare the metrics of two versions
    Compare {
        /// Baseline version
        version_a: String,

        /// Candidate version
        version_b: String,
    },
}

#[derive(Subcommand)]
enum MonitorAction {
    /// Print the monitoring report (overall metrics, last 24 hours, alerts)
    Report,

    /// Record one served outcome
    Log {
        /// Version that served the request
        #[arg(long)]
        model_version: String,

        /// Predicted label
        #[arg(long, requires_all = ["confidence", "latency_ms"], required_unless_present = "error")]
        prediction: Option<Label>,

        /// Classifier confidence in [0, 1]
        #[arg(long, value_parser = parse_finite)]
        confidence: Option<f64>,

        /// Inference latency in milliseconds
        #[arg(long, value_parser = parse_finite)]
        latency_ms: Option<f64>,

        /// Error message for a failed inference
        #[arg(long, conflicts_with_all = ["prediction", "confidence", "latency_ms"])]
        error: Option<String>,
    },

    /// Show outcomes logged in the last N hours
    Recent {
        /// Window size in hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// Evaluate alert rules against the current metrics
    Alerts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PromoteTarget {
    Staging,
    Production,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    modelctl_core::init_tracing(cli.json, level);

    let config = resolve_config(&cli)?;

    let result = match cli.command {
        Commands::Deploy {
            version,
            env,
            rollback,
        } => cmd_deploy(&config, &version, &env, rollback),
        Commands::Registry { action } => match action {
            RegistryAction::Summary => cmd_registry_summary(&config),
            RegistryAction::List => cmd_registry_list(&config),
            RegistryAction::Show { version } => cmd_registry_show(&config, &version),
            RegistryAction::Register {
                version,
                metrics,
                description,
            } => cmd_registry_register(&config, &version, metrics, description.as_deref()),
            RegistryAction::Promote { version, to } => cmd_registry_promote(&config, &version, to),
            RegistryAction::Compare {
                version_a,
                version_b,
            } => cmd_registry_compare(&config, &version_a, &version_b),
        },
        Commands::Monitor { action } => match action {
            MonitorAction::Report => cmd_monitor_report(&config),
            MonitorAction::Log {
                model_version,
                prediction,
                confidence,
                latency_ms,
                error,
            } => {
                let event = build_event(model_version, prediction, confidence, latency_ms, error)?;
                cmd_monitor_log(&config, event)
            }
            MonitorAction::Recent { hours } => cmd_monitor_recent(&config, hours),
            MonitorAction::Alerts => cmd_monitor_alerts(&config),
        },
    };

    COUNTERS.flush();
    result
}

/// Environment configuration with command-line overrides applied on top.
fn resolve_config(cli: &Cli) -> Result<LifecycleConfig> {
    let mut config =
        LifecycleConfig::from_env().context("Failed to read configuration from environment")?;
    if let Some(dir) = &cli.registry_dir {
        config = config.with_registry_dir(dir);
    }
    if let Some(dir) = &cli.monitor_dir {
        config = config.with_monitor_dir(dir);
    }
    if let Some(dir) = &cli.staging_dir {
        config = config.with_staging_dir(dir);
    }
    if let Some(dir) = &cli.production_dir {
        config = config.with_production_dir(dir);
    }
    Ok(config)
}

fn parse_metric(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("metric name is empty in '{raw}'"));
    }
    let value = parse_finite(value).map_err(|e| format!("metric '{name}': {e}"))?;
    Ok((name.to_string(), value))
}

fn parse_finite(raw: &str) -> std::result::Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{raw}' is not a finite number"))
}

fn build_event(
    model_version: String,
    prediction: Option<Label>,
    confidence: Option<f64>,
    latency_ms: Option<f64>,
    error: Option<String>,
) -> Result<PredictionEvent> {
    if let Some(error) = error {
        return Ok(PredictionEvent::failure(model_version, error));
    }
    match (prediction, confidence, latency_ms) {
        (Some(label), Some(confidence), Some(latency_ms)) => Ok(PredictionEvent::prediction(
            model_version,
            label,
            confidence,
            latency_ms,
        )),
        _ => anyhow::bail!(
            "either --error or all of --prediction, --confidence and --latency-ms are required"
        ),
    }
}

// ========== Deploy ==========

fn cmd_deploy(config: &LifecycleConfig, version: &str, env: &str, rollback: bool) -> Result<()> {
    let registry = ModelRegistry::from_config(config).context("Failed to open registry")?;
    let deployer = Deployer::new(&registry, DeployTargets::from_config(config));

    let outcome = if rollback {
        info!(version = %version, "rolling production back");
        deployer.rollback(version)?
    } else {
        deployer.deploy(version, env)?
    };

    print!("{}", outcome.render_text());
    if !outcome.success() {
        anyhow::bail!("Deployment of {} failed", version);
    }
    Ok(())
}

// ========== Registry Commands ==========

fn open_registry(config: &LifecycleConfig) -> Result<ModelRegistry> {
    ModelRegistry::from_config(config).context("Failed to open registry")
}

fn cmd_registry_summary(config: &LifecycleConfig) -> Result<()> {
    let summary = open_registry(config)?.summary()?;

    println!("MODEL REGISTRY SUMMARY");
    println!(
        "Production model: {}",
        summary.production_version.as_deref().unwrap_or("None")
    );
    println!(
        "Staging model: {}",
        summary.staging_version.as_deref().unwrap_or("None")
    );
    println!("Total models: {}", summary.model_count);
    Ok(())
}

fn cmd_registry_list(config: &LifecycleConfig) -> Result<()> {
    let models = open_registry(config)?.list_models()?;
    if models.is_empty() {
        println!("No models registered");
        return Ok(());
    }

    for model in &models {
        println!("{}", format_model_line(model));
    }
    Ok(())
}

fn format_model_line(model: &ModelVersion) -> String {
    let metrics = model
        .metrics
        .iter()
        .map(|(k, v)| format!("{k}={v:.4}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{:<16} {:<10} {} {}",
        model.version,
        model.status.as_str(),
        model.timestamp.format("%Y-%m-%d %H:%M:%S"),
        metrics
    )
}

fn cmd_registry_show(config: &LifecycleConfig, version: &str) -> Result<()> {
    let model = open_registry(config)?.get_model(version)?;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

fn cmd_registry_register(
    config: &LifecycleConfig,
    version: &str,
    metrics: Vec<(String, f64)>,
    description: Option<&str>,
) -> Result<()> {
    let metrics: BTreeMap<String, f64> = metrics.into_iter().collect();
    let model = open_registry(config)?
        .register(version, metrics, description)
        .with_context(|| format!("Failed to register {}", version))?;

    println!(
        "Registered {} ({} metrics) at {}",
        model.version,
        model.metrics.len(),
        model.artifact_path.display()
    );
    Ok(())
}

fn cmd_registry_promote(config: &LifecycleConfig, version: &str, to: PromoteTarget) -> Result<()> {
    let registry = open_registry(config)?;
    match to {
        PromoteTarget::Staging => registry.promote_to_staging(version)?,
        PromoteTarget::Production => registry.promote_to_production(version)?,
    }
    let model = registry.get_model(version)?;
    println!("Promoted {} -> {}", model.version, model.status);
    Ok(())
}

fn cmd_registry_compare(config: &LifecycleConfig, version_a: &str, version_b: &str) -> Result<()> {
    let comparison = open_registry(config)?.compare_models(version_a, version_b)?;
    print!("{}", comparison.render_text());
    Ok(())
}

// ========== Monitor Commands ==========

fn open_monitor(config: &LifecycleConfig) -> Result<ProductionMonitor> {
    ProductionMonitor::from_config(config).context("Failed to open monitor")
}

fn cmd_monitor_report(config: &LifecycleConfig) -> Result<()> {
    let report = open_monitor(config)?.generate_report()?;
    print!("{}", report.render_text());
    Ok(())
}

fn cmd_monitor_log(config: &LifecycleConfig, event: PredictionEvent) -> Result<()> {
    let record = open_monitor(config)?.log_prediction(event)?;
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

fn cmd_monitor_recent(config: &LifecycleConfig, hours: u32) -> Result<()> {
    let records = open_monitor(config)?.recent_predictions(hours)?;
    if records.is_empty() {
        println!("No predictions in the last {} hours", hours);
        return Ok(());
    }
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

fn cmd_monitor_alerts(config: &LifecycleConfig) -> Result<()> {
    let alerts = open_monitor(config)?.check_alerts()?;
    if alerts.is_empty() {
        println!("No active alerts");
        return Ok(());
    }
    for alert in &alerts {
        println!(
            "[{}] {}: {}",
            alert.severity.as_str().to_uppercase(),
            alert.kind.as_str(),
            alert.message
        );
    }
    Ok(())
}
