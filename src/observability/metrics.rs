//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by backend and status
//! - `dispatch_request_duration_seconds` (histogram): end-to-end latency
//! - `dispatch_retries_total` (counter): transport-level retries
//! - `backend_healthy` (gauge): 1=healthy, 0=unhealthy, per backend
//! - `registry_counter_clamped_total` (counter): decrement-below-zero
//!   invariant violations, per counter name

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record a completed dispatch as seen by the caller.
pub fn record_request(backend: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Record one transport-level retry.
pub fn record_retry() {
    metrics::counter!("dispatch_retries_total").increment(1);
}

/// Record a backend health transition (or re-confirmation).
pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("backend_healthy", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a clamped counter decrement (bookkeeping invariant violation).
pub fn record_counter_clamp(counter: &'static str) {
    metrics::counter!("registry_counter_clamped_total", "counter" => counter).increment(1);
}
