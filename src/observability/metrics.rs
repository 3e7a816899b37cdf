//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_api_requests_total` (counter): API calls by outcome
//! - `proxy_origin_fetch_total` (counter): origin fetches by result
//! - `proxy_origin_fetch_duration_seconds` (histogram): origin latency
//! - `proxy_tunnels_total` (counter): CONNECT tunnels by result
//! - `proxy_forward_requests_total` (counter): relayed requests by result
//! - `proxy_active_connections` (gauge): current connection count
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_api_request(outcome: &'static str) {
    counter!("proxy_api_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_origin_fetch(result: &'static str, start: Instant) {
    counter!("proxy_origin_fetch_total", "result" => result).increment(1);
    histogram!("proxy_origin_fetch_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_tunnel(result: &'static str) {
    counter!("proxy_tunnels_total", "result" => result).increment(1);
}

pub fn record_forward(result: &'static str) {
    counter!("proxy_forward_requests_total", "result" => result).increment(1);
}

pub fn record_active_connections(count: u64) {
    gauge!("proxy_active_connections").set(count as f64);
}
