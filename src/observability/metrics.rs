//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_rounds_total` (counter): completed rounds
//! - `health_round_duration_seconds` (histogram): round latency
//! - `health_round_failing_probes` (gauge): failing probes in the last round
//! - `health_probe_failures_total` (counter): failures by probe
//! - `health_wakeups_skipped_total` (counter): debounced wake-ups by reason
//! - `health_overall_state` (gauge): 0=unknown, 1=healthy, 2=unhealthy
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::HealthState;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_round(elapsed: Duration, failing: usize) {
    counter!("health_rounds_total").increment(1);
    histogram!("health_round_duration_seconds").record(elapsed.as_secs_f64());
    gauge!("health_round_failing_probes").set(failing as f64);
}

pub fn record_probe_failure(probe: &str) {
    counter!("health_probe_failures_total", "probe" => probe.to_string()).increment(1);
}

pub fn record_skipped_wakeup(reason: &'static str) {
    counter!("health_wakeups_skipped_total", "reason" => reason).increment(1);
}

pub fn record_overall_health(state: HealthState) {
    gauge!("health_overall_state").set(state as u8 as f64);
}
