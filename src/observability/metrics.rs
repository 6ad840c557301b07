//! Metrics collection and exposition.
//!
//! # Metrics
//! - `traffic_manager_requests_total` (counter): requests by protocol (rpc, http)
//! - `traffic_manager_active_connections` (gauge): open client connections
//! - `traffic_manager_systema_refs` (gauge): outstanding System A connection references
//! - `traffic_manager_systema_calls_total` (counter): System A calls by call and outcome
//! - `traffic_manager_intercepts_expired_total` (counter): intercepts evicted by lease expiry
//! - `traffic_manager_intercept_deletions_total` (counter): deletion pipeline dispositions

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(protocol: &'static str) {
    counter!("traffic_manager_requests_total", "protocol" => protocol).increment(1);
}

pub fn set_active_connections(count: u64) {
    gauge!("traffic_manager_active_connections").set(count as f64);
}

pub fn set_systema_refs(count: usize) {
    gauge!("traffic_manager_systema_refs").set(count as f64);
}

pub fn record_systema_call(call: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("traffic_manager_systema_calls_total", "call" => call, "outcome" => outcome)
        .increment(1);
}

pub fn record_expired(count: usize) {
    counter!("traffic_manager_intercepts_expired_total").increment(count as u64);
}

pub fn record_deletion(outcome: &'static str) {
    counter!("traffic_manager_intercept_deletions_total", "outcome" => outcome).increment(1);
}
