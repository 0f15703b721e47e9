//! Metrics collection and exposition.
//!
//! # Metrics
//! - `custody_broadcasts_total` (counter): successful broadcasts by kind
//! - `custody_events_correlated_total` (counter): enrichments by kind
//! - `custody_operation_records` (gauge): records held by the store
//! - `custody_chain_reachable` (gauge): 1=reachable, 0=unreachable
//!
//! # Design Decisions
//! - Recording helpers are cheap no-ops until an exporter is installed, so
//!   subsystems call them unconditionally

use metrics::{counter, gauge};
use std::net::SocketAddr;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// A wallet operation was broadcast and recorded.
pub fn record_broadcast(kind: &'static str) {
    counter!("custody_broadcasts_total", "kind" => kind).increment(1);
}

/// An event was correlated into a record.
pub fn record_event_correlated(kind: &'static str) {
    counter!("custody_events_correlated_total", "kind" => kind).increment(1);
}

/// Current record count in the reconciliation store.
pub fn record_store_size(count: usize) {
    gauge!("custody_operation_records").set(count as f64);
}

/// Chain connectivity as observed by the health check.
pub fn record_chain_health(healthy: bool) {
    gauge!("custody_chain_reachable").set(if healthy { 1.0 } else { 0.0 });
}
