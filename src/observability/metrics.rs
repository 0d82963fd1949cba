//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_round_trips_total` (counter): round trips by outcome
//! - `bridge_round_trip_duration_seconds` (histogram): round-trip latency
//! - `bridge_connected_peers` (gauge): registered peers
//! - `bridge_pending_requests` (gauge): outstanding round trips
//! - `bridge_discarded_replies_total` (counter): unroutable frames by reason
//! - `bridge_peer_evictions_total` (counter): peers dropped after a failed send
//!
//! Recording is a no-op until `init_metrics` installs the exporter, so the
//! core can be exercised in tests without one.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_round_trip(outcome: &'static str, start: Instant) {
    counter!("bridge_round_trips_total", "outcome" => outcome).increment(1);
    histogram!("bridge_round_trip_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn set_connected_peers(count: usize) {
    gauge!("bridge_connected_peers").set(count as f64);
}

pub fn set_pending_requests(count: usize) {
    gauge!("bridge_pending_requests").set(count as f64);
}

pub fn record_discarded_reply(reason: &'static str) {
    counter!("bridge_discarded_replies_total", "reason" => reason).increment(1);
}

pub fn record_peer_evictions(count: usize) {
    counter!("bridge_peer_evictions_total").increment(count as u64);
}
