//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by outcome
//! - `relay_downstream_duration_seconds` (histogram): processor latency by outcome
//! - `relay_cleanup_failures_total` (counter): transient files that could not be deleted
//! - `relay_upload_bytes` (histogram): accepted upload sizes
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_outcome(outcome: &'static str) {
    ::metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_downstream(outcome: &'static str, elapsed: Duration) {
    ::metrics::histogram!("relay_downstream_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn record_cleanup_failure() {
    ::metrics::counter!("relay_cleanup_failures_total").increment(1);
}

pub fn record_upload_bytes(bytes: u64) {
    ::metrics::histogram!("relay_upload_bytes").record(bytes as f64);
}
