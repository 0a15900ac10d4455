//! Process-local atomic counters for lifecycle activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Counters::flush`] to emit current values as a single
//! `tracing::info!` event (the CLI does this before exiting).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global counters.
pub static COUNTERS: Counters = Counters::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Counters {
    registrations: AtomicU64,
    promotions: AtomicU64,
    deployments: AtomicU64,
    predictions_logged: AtomicU64,
    alerts_raised: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            deployments: AtomicU64::new(0),
            predictions_logged: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
        }
    }

    pub fn inc_registrations(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_promotions(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deployments(&self) {
        self.deployments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_predictions_logged(&self) {
        self.predictions_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_alerts_raised(&self, n: u64) {
        self.alerts_raised.fetch_add(n, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            registrations = self.registrations(),
            promotions = self.promotions(),
            deployments = self.deployments(),
            predictions_logged = self.predictions_logged(),
            alerts_raised = self.alerts_raised(),
        );
    }

    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    pub fn deployments(&self) -> u64 {
        self.deployments.load(Ordering::Relaxed)
    }

    pub fn predictions_logged(&self) -> u64 {
        self.predictions_logged.load(Ordering::Relaxed)
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let c = Counters::new();
        c.inc_registrations();
        c.inc_promotions();
        c.inc_promotions();
        c.inc_deployments();
        c.inc_predictions_logged();
        c.add_alerts_raised(2);

        assert_eq!(c.registrations(), 1);
        assert_eq!(c.promotions(), 2);
        assert_eq!(c.deployments(), 1);
        assert_eq!(c.predictions_logged(), 1);
        assert_eq!(c.alerts_raised(), 2);
    }
}
