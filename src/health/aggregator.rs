//! Probe fan-out and snapshot publication.
//!
//! # Responsibilities
//! - Run every configured probe concurrently, once per round
//! - Collect failures into a fresh map
//! - Publish the map as the new snapshot
//!
//! # Design Decisions
//! - One blocking-pool worker per probe; failures flow through one channel
//! - The channel closes when the last worker drops its sender, which ends the collector
//! - A failing probe never aborts the round

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::health::probe::{Probe, ProbeError};
use crate::health::snapshot::{Snapshot, SnapshotStore};
use crate::observability::metrics;

/// Runs the fixed probe set and owns the published snapshot.
pub struct Aggregator {
    probes: Vec<Arc<dyn Probe>>,
    store: SnapshotStore,
    probe_timeout: Option<Duration>,
}

impl Aggregator {
    /// Create an aggregator over `probes`. Probes are fixed for its lifetime.
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        Self {
            probes,
            store: SnapshotStore::new(),
            probe_timeout: None,
        }
    }

    /// Record probes still running after `timeout` as timed out.
    ///
    /// The blocking call itself cannot be interrupted and keeps its pool thread
    /// until it returns.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Reader handle onto the published snapshot.
    pub fn store(&self) -> SnapshotStore {
        self.store.clone()
    }

    /// Execute one round and publish its snapshot.
    pub async fn run_round(&self) -> Arc<Snapshot> {
        let started = Instant::now();
        let (error_tx, mut error_rx) = mpsc::unbounded_channel::<(String, ProbeError)>();

        let collector = tokio::spawn(async move {
            let mut failures = BTreeMap::new();
            while let Some((name, err)) = error_rx.recv().await {
                failures.insert(name, err);
            }
            failures
        });

        for probe in &self.probes {
            let probe = probe.clone();
            let error_tx = error_tx.clone();
            let timeout = self.probe_timeout;

            tokio::spawn(async move {
                let name = probe.name().to_string();
                let worker = tokio::task::spawn_blocking(move || probe.probe());

                let outcome = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, worker).await {
                        Ok(joined) => flatten(joined),
                        Err(_) => Err(ProbeError::TimedOut(limit)),
                    },
                    None => flatten(worker.await),
                };

                if let Err(err) = outcome {
                    tracing::warn!(probe = %name, error = %err, "Health probe failed");
                    metrics::record_probe_failure(&name);
                    let _ = error_tx.send((name, err));
                }
            });
        }
        drop(error_tx);

        let failures = match collector.await {
            Ok(failures) => failures,
            Err(e) => {
                tracing::error!(error = %e, "Failure collector aborted, publishing empty round");
                BTreeMap::new()
            }
        };

        let snapshot = self.store.publish(Snapshot::new(failures));
        metrics::record_round(started.elapsed(), snapshot.len());

        tracing::debug!(
            probes = self.probes.len(),
            failing = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Health round complete"
        );
        snapshot
    }
}

fn flatten(joined: Result<Result<(), ProbeError>, JoinError>) -> Result<(), ProbeError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ProbeError::Panicked),
        Err(e) => Err(ProbeError::failed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::FnProbe;

    fn ok(name: &str) -> Arc<dyn Probe> {
        Arc::new(FnProbe::new(name, || Ok(())))
    }

    fn failing(name: &str, message: &'static str) -> Arc<dyn Probe> {
        Arc::new(FnProbe::new(name, move || Err(ProbeError::failed(message))))
    }

    #[tokio::test]
    async fn test_all_healthy_round_is_empty() {
        let aggregator = Aggregator::new(vec![ok("db"), ok("cache"), ok("queue")]);
        let snapshot = aggregator.run_round().await;
        assert!(snapshot.is_empty());
        assert!(aggregator.store().load().is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_is_recorded() {
        let aggregator = Aggregator::new(vec![ok("db"), failing("cache", "connection refused"), ok("queue")]);
        let snapshot = aggregator.run_round().await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("cache"),
            Some(&ProbeError::failed("connection refused"))
        );
    }

    #[tokio::test]
    async fn test_no_probes_is_healthy() {
        let aggregator = Aggregator::new(Vec::new());
        assert!(aggregator.run_round().await.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_probe_does_not_abort_round() {
        let panicky: Arc<dyn Probe> = Arc::new(FnProbe::new("panicky", || -> Result<(), ProbeError> { panic!("boom") }));
        let aggregator = Aggregator::new(vec![panicky, failing("db", "down"), ok("cache")]);

        let snapshot = aggregator.run_round().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("panicky"), Some(&ProbeError::Panicked));
    }

    #[tokio::test]
    async fn test_slow_probe_times_out() {
        let slow: Arc<dyn Probe> = Arc::new(FnProbe::new("slow", || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        }));
        let aggregator = Aggregator::new(vec![slow, ok("fast")])
            .with_probe_timeout(Duration::from_millis(50));

        let snapshot = aggregator.run_round().await;
        assert_eq!(
            snapshot.get("slow"),
            Some(&ProbeError::TimedOut(Duration::from_millis(50)))
        );
        assert!(snapshot.get("fast").is_none());
    }
}
