//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the poller:
//! - HTTP request metrics for the observability listener
//! - Scheduler status (collected dynamically)
//! - Core tick, fetch and store metrics (registered from the core crate)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "followtrack_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("followtrack_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics (dynamic)
// =============================================================================

/// Scheduler running status (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "followtrack_scheduler_running",
        "Whether the poll scheduler is running",
    )
    .unwrap()
});

/// Ticks in flight across all jobs.
pub static TICKS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "followtrack_ticks_in_flight",
        "Number of ticks currently running across all jobs",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();

    // Scheduler
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKS_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (ticks, fetches, store, job set)
    for metric in followtrack_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the scheduler right now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.scheduler_status().await;
    SCHEDULER_RUNNING.set(i64::from(status.running));

    let in_flight: usize = status.jobs.iter().map(|job| job.in_flight).sum();
    TICKS_IN_FLIGHT.set(in_flight as i64);
}
