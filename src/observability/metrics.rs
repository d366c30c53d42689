//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, path, status
//! - `relay_request_duration_seconds` (histogram): request latency
//! - `relay_publish_total` (counter): publish attempts by topic, outcome
//! - `relay_publish_duration_seconds` (histogram): time waiting for placement
//! - `relay_connector_reconcile_total` (counter): reconcile passes by outcome
//! - `relay_record_sink_errors_total` (counter): swallowed sink failures
//! - `relay_records_dropped_total` (counter): records shed by a full sink buffer
//!
//! Without an installed recorder every call is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("relay_requests_total", &labels).increment(1);
    metrics::histogram!("relay_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_publish(topic: &str, outcome: &'static str, start: Instant) {
    let labels = [("topic", topic.to_string()), ("outcome", outcome.to_string())];
    metrics::counter!("relay_publish_total", &labels).increment(1);
    metrics::histogram!("relay_publish_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reconcile(outcome: &'static str) {
    metrics::counter!("relay_connector_reconcile_total", "outcome" => outcome).increment(1);
}

pub fn record_sink_error() {
    metrics::counter!("relay_record_sink_errors_total").increment(1);
}

pub fn record_dropped() {
    metrics::counter!("relay_records_dropped_total").increment(1);
}
