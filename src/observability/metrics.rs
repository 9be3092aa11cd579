//! Metrics collection and exposition.
//!
//! # Metrics
//! - `registry_submissions_total` (counter): submissions by region, outcome
//! - `registry_sequence_gaps_total` (counter): sequence numbers lost to write failures
//! - `registry_request_duration_seconds` (histogram): latency by method, status

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one submission outcome.
pub fn record_submission(region: &str, outcome: &'static str) {
    metrics::counter!(
        "registry_submissions_total",
        "region" => region.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Count a sequence number consumed without a stored record.
pub fn record_sequence_gap(region: &str) {
    metrics::counter!("registry_sequence_gaps_total", "region" => region.to_string()).increment(1);
}

/// Record request latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::histogram!(
        "registry_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
