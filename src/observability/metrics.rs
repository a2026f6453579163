//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reptile_connections_total` (counter): accepted connections by outcome
//! - `reptile_active_sessions` (gauge): currently tracked sessions
//! - `reptile_evaluations_total` (counter): evaluated forms by outcome
//! - `reptile_evaluation_duration_seconds` (histogram): evaluation latency
//! - `reptile_forced_terminations_total` (counter): sessions aborted on drain timeout
//!
//! Without an installed recorder every call is a no-op, so the library can
//! record unconditionally.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted() {
    counter!("reptile_connections_total", "outcome" => "accepted").increment(1);
}

pub fn record_connection_rejected() {
    counter!("reptile_connections_total", "outcome" => "rejected").increment(1);
}

pub fn set_active_sessions(count: usize) {
    gauge!("reptile_active_sessions").set(count as f64);
}

pub fn record_evaluation(ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("reptile_evaluations_total", "outcome" => outcome).increment(1);
    histogram!("reptile_evaluation_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_forced_terminations(count: usize) {
    counter!("reptile_forced_terminations_total").increment(count as u64);
}
