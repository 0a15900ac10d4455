//! Domain models for the model lifecycle manager.
//!
//! Canonical definitions for the core entities:
//! - `ModelVersion` / `RegistrySnapshot`: registered artifacts and promotion state
//! - `PredictionEvent` / `PredictionRecord`: production outcomes
//! - `MetricsSnapshot`: running production aggregate

pub mod error;
pub mod model;
pub mod outcome;

// Re-export main types and errors
pub use error::{ModelctlError, Result};
pub use model::{ModelStatus, ModelVersion, RegistrySnapshot};
pub use outcome::{Label, MetricsSnapshot, Outcome, PredictionEvent, PredictionRecord};
