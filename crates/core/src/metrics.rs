//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job ticks (outcome per tick, including suppressed ticks)
//! - Fetches (errors by kind, duration)
//! - Store access (writes, registry refreshes)
//! - Scheduler job set (registered, retired, active)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Tick Metrics
// =============================================================================

/// Ticks total by outcome.
pub static TICKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("followtrack_ticks_total", "Total job ticks by outcome"),
        &["outcome"], // "written", "fetch_failed", "write_failed", "suppressed"
    )
    .unwrap()
});

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Fetch errors by kind.
pub static FETCH_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("followtrack_fetch_errors_total", "Total fetch errors by kind"),
        &["kind"], // "network", "non_success_status", "pattern_not_found"
    )
    .unwrap()
});

/// Fetch duration in seconds (transport round trip, including failures).
pub static FETCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "followtrack_fetch_duration_seconds",
            "Duration of profile page fetches",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

// =============================================================================
// Store Metrics
// =============================================================================

/// Count writes by result.
pub static WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("followtrack_writes_total", "Total follower count writes"),
        &["result"], // "success", "store_unavailable"
    )
    .unwrap()
});

/// Registry refreshes by result.
pub static REGISTRY_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "followtrack_registry_refreshes_total",
            "Total target registry refreshes",
        ),
        &["result"], // "success", "unavailable"
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Jobs registered total.
pub static JOBS_REGISTERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("followtrack_jobs_registered_total", "Total jobs registered").unwrap()
});

/// Jobs retired total (targets removed from the registry).
pub static JOBS_RETIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("followtrack_jobs_retired_total", "Total jobs retired").unwrap()
});

/// Jobs currently scheduled.
pub static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("followtrack_active_jobs", "Number of scheduled jobs").unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Ticks
        Box::new(TICKS_TOTAL.clone()),
        // Fetches
        Box::new(FETCH_ERRORS.clone()),
        Box::new(FETCH_DURATION.clone()),
        // Store
        Box::new(WRITES_TOTAL.clone()),
        Box::new(REGISTRY_REFRESHES.clone()),
        // Scheduler
        Box::new(JOBS_REGISTERED.clone()),
        Box::new(JOBS_RETIRED.clone()),
        Box::new(ACTIVE_JOBS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register_without_conflict() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        TICKS_TOTAL.with_label_values(&["suppressed"]).inc();
        FETCH_ERRORS.with_label_values(&["network"]).inc();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"followtrack_ticks_total".to_string()));
        assert!(names.contains(&"followtrack_fetch_errors_total".to_string()));
        assert!(names.contains(&"followtrack_active_jobs".to_string()));
    }
}
