//! Metrics collection and exposition.
//!
//! # Metrics
//! - `adapter_connections_total` (counter): connections accepted
//! - `adapter_active_connections` (gauge): connections currently open
//! - `adapter_bytes_total` (counter): bytes pumped, by direction
//! - `adapter_transport_errors_total` (counter): transport failures, by direction
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for direction only; per-connection detail belongs in logs

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::pipeline::Direction;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    counter!("adapter_connections_total").increment(1);
    gauge!("adapter_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("adapter_active_connections").decrement(1.0);
}

pub fn record_bytes(direction: Direction, bytes: usize) {
    counter!("adapter_bytes_total", "direction" => direction.as_str()).increment(bytes as u64);
}

pub fn record_transport_error(direction: Direction) {
    counter!("adapter_transport_errors_total", "direction" => direction.as_str()).increment(1);
}
