//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fleet_requests_total` (counter): gateway calls by endpoint, outcome
//! - `fleet_breaker_trips_total` (counter): breaker trips by resource
//! - `fleet_cache_lookups_total` (counter): cache hits and misses
//! - `fleet_cache_entries` (gauge): physically stored cache entries
//! - `fleet_realtime_reconnects_total` (counter): reconnect attempts
//! - `fleet_realtime_connected` (gauge): 1=connected, 0=not
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &str, outcome: &'static str) {
    metrics::counter!(
        "fleet_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_breaker_trip(resource: &str) {
    metrics::counter!("fleet_breaker_trips_total", "resource" => resource.to_string()).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("fleet_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!("fleet_cache_entries").set(size as f64);
}

pub fn record_reconnect_attempt() {
    metrics::counter!("fleet_realtime_reconnects_total").increment(1);
}

pub fn record_realtime_connected(connected: bool) {
    metrics::gauge!("fleet_realtime_connected").set(if connected { 1.0 } else { 0.0 });
}
