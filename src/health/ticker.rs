//! Adaptive round scheduler.
//!
//! # Responsibilities
//! - Decide when the aggregator runs a round
//! - Poll on the steady interval while healthy, the recovery interval otherwise
//! - Debounce wake-ups so rounds never overlap or start too close together
//! - Publish one transition per edge of the overall OK flag
//!
//! # Tasks
//! ```text
//! recovery loop ──(not OK)──▶ async-check ─┐
//! steady interval ─────────────────────────┼─▶ main loop ─▶ debounce ─▶ round task
//! request-check channel ──(claim)──────────┘                               │
//!                                                  health lock ◀───────────┘
//! ```
//!
//! # Design Decisions
//! - Two locks: `checking` guards round timing and is held for a round's whole
//!   lifetime, `health` guards the state. Reading health never waits on a round.
//! - A wake-up that finds a round in flight or inside the debounce floor is dropped
//! - The recovery timer restarts when a round completes, so retries land on
//!   the debounce floor instead of just inside it
//! - `close()` waits for an already-dispatched round before returning

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::TickerConfig;
use crate::health::aggregator::Aggregator;
use crate::health::snapshot::{Snapshot, SnapshotStore};
use crate::health::state::HealthState;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Why the main loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Shutdown,
    Recovery,
    Steady,
    Claim(bool),
    RequestsClosed,
}

impl Wake {
    fn as_str(self) -> &'static str {
        match self {
            Wake::Shutdown => "shutdown",
            Wake::Recovery => "recovery",
            Wake::Steady => "steady",
            Wake::Claim(_) => "request",
            Wake::RequestsClosed => "requests_closed",
        }
    }
}

#[derive(Debug, Default)]
struct CheckTimes {
    last_started: Option<Instant>,
    last_completed: Option<Instant>,
}

impl CheckTimes {
    fn too_soon(&self, now: Instant, floor: Duration) -> bool {
        let within = |at: Option<Instant>| at.is_some_and(|at| now < at + floor);
        within(self.last_started) || within(self.last_completed)
    }
}

struct Shared {
    aggregator: Arc<Aggregator>,
    store: SnapshotStore,
    recovery_interval: Duration,
    checking: Arc<Mutex<CheckTimes>>,
    health: Mutex<HealthState>,
    transitions: Option<mpsc::Sender<bool>>,
    round_completed: Notify,
    closing: watch::Sender<bool>,
}

impl Shared {
    /// Start a round unless one is running or the debounce floor has not passed.
    fn try_start_round(self: &Arc<Self>, wake: Wake) -> Option<JoinHandle<()>> {
        let mut times = match self.checking.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(reason = wake.as_str(), "Round in flight, dropping wake-up");
                metrics::record_skipped_wakeup(wake.as_str());
                return None;
            }
        };

        let now = Instant::now();
        if times.too_soon(now, self.recovery_interval) {
            tracing::debug!(reason = wake.as_str(), "Inside debounce floor, dropping wake-up");
            metrics::record_skipped_wakeup(wake.as_str());
            return None;
        }
        times.last_started = Some(now);

        tracing::debug!(reason = wake.as_str(), "Starting health round");
        let shared = self.clone();
        Some(tokio::spawn(async move {
            let snapshot = shared.aggregator.run_round().await;
            times.last_completed = Some(Instant::now());
            drop(times);
            shared.round_completed.notify_one();

            shared.apply_round(snapshot.is_empty()).await;
        }))
    }

    async fn apply_round(&self, healthy: bool) {
        let mut state = self.health.lock().await;
        let previous = *state;
        if let Some(edge) = state.observe_round(healthy) {
            if edge {
                tracing::info!(from = previous.as_str(), "Dependencies healthy again");
            } else {
                tracing::warn!(from = previous.as_str(), "Dependencies became unhealthy");
            }
            self.publish(edge).await;
        }
        metrics::record_overall_health(*state);
    }

    async fn apply_claim(&self, claimed: bool) {
        let mut state = self.health.lock().await;
        if let Some(edge) = state.observe_claim(claimed) {
            tracing::warn!("Failure reported out of band, marking unhealthy");
            self.publish(edge).await;
            metrics::record_overall_health(*state);
        } else if claimed && !state.is_ok() {
            tracing::debug!("Ignoring healthy claim until a round confirms it");
        }
    }

    async fn publish(&self, edge: bool) {
        let Some(tx) = &self.transitions else {
            return;
        };
        let mut closing = self.closing.subscribe();
        // Deliver whenever there is room, even while closing.
        tokio::select! {
            biased;
            sent = tx.send(edge) => {
                if sent.is_err() {
                    tracing::debug!(healthy = edge, "Transition receiver dropped");
                }
            }
            _ = closing.wait_for(|closed| *closed) => {
                tracing::warn!(healthy = edge, "Ticker closing, dropping undelivered transition");
            }
        }
    }
}

/// Schedules aggregator rounds and tracks overall health.
pub struct Ticker {
    shared: Arc<Shared>,
    shutdown: Shutdown,
    main_loop: Option<JoinHandle<()>>,
    recovery_loop: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start scheduling rounds. Must be called inside a Tokio runtime.
    ///
    /// `transitions` receives `true` on every unhealthy→healthy edge and `false`
    /// on every healthy→unhealthy edge. A consumer must keep draining it: edges
    /// are sent while the health lock is held, and health reads wait behind a
    /// full channel. `requests` accepts out-of-band health claims; `false` is
    /// applied at once, `true` waits for a round.
    ///
    /// A zero interval in `config` is replaced by its default.
    pub fn start(
        aggregator: Arc<Aggregator>,
        config: &TickerConfig,
        transitions: Option<mpsc::Sender<bool>>,
        requests: Option<mpsc::Receiver<bool>>,
    ) -> Self {
        let defaults = TickerConfig::default();
        let interval = non_zero("interval_ms", config.interval(), defaults.interval());
        let recovery_interval = non_zero(
            "recovery_interval_ms",
            config.recovery_interval(),
            defaults.recovery_interval(),
        );

        let shared = Arc::new(Shared {
            store: aggregator.store(),
            aggregator,
            recovery_interval,
            checking: Arc::new(Mutex::new(CheckTimes::default())),
            health: Mutex::new(HealthState::Unknown),
            transitions,
            round_completed: Notify::new(),
            closing: watch::Sender::new(false),
        });

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            recovery_interval_ms = recovery_interval.as_millis() as u64,
            probes = shared.aggregator.probe_count(),
            "Health ticker starting"
        );

        let shutdown = Shutdown::new();
        let (async_check_tx, async_check_rx) = mpsc::channel(1);

        let recovery_loop = tokio::spawn(run_recovery_loop(
            shared.clone(),
            shutdown.subscribe(),
            async_check_tx,
        ));
        let main_loop = tokio::spawn(run_main_loop(
            shared.clone(),
            interval,
            shutdown.subscribe(),
            async_check_rx,
            requests,
        ));

        Self {
            shared,
            shutdown,
            main_loop: Some(main_loop),
            recovery_loop: Some(recovery_loop),
        }
    }

    /// Current overall state.
    pub async fn state(&self) -> HealthState {
        *self.shared.health.lock().await
    }

    /// True once a round has succeeded and no failure has been seen since.
    pub async fn is_healthy(&self) -> bool {
        self.state().await.is_ok()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.store.load()
    }

    /// Reader handle onto the published snapshot, e.g. for the HTTP server.
    pub fn store(&self) -> SnapshotStore {
        self.shared.store.clone()
    }

    /// Stop all background tasks.
    ///
    /// Returns once the main loop and the recovery loop have exited and any
    /// round already dispatched has published its snapshot. A transition
    /// still waiting on a full channel is dropped rather than delivered.
    pub async fn close(mut self) {
        self.shared.closing.send_replace(true);
        self.shutdown.trigger();

        if let Some(handle) = self.main_loop.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Ticker main loop failed");
            }
        }
        if let Some(handle) = self.recovery_loop.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Ticker recovery loop failed");
            }
        }
        tracing::info!("Health ticker stopped");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shared.closing.send_replace(true);
        self.shutdown.trigger();
    }
}

async fn run_recovery_loop(
    shared: Arc<Shared>,
    mut shutdown: broadcast::Receiver<()>,
    async_check: mpsc::Sender<()>,
) {
    let period = shared.recovery_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = shared.round_completed.notified() => ticker.reset(),
            _ = ticker.tick() => {
                let state = shared.health.lock().await;
                if !state.is_ok() {
                    // A full slot already carries a pending request.
                    let _ = async_check.try_send(());
                }
            }
        }
    }
}

async fn run_main_loop(
    shared: Arc<Shared>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut async_check: mpsc::Receiver<()>,
    mut requests: Option<mpsc::Receiver<bool>>,
) {
    let mut steady = time::interval_at(Instant::now() + interval, interval);
    steady.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        let wake = tokio::select! {
            _ = shutdown.recv() => Wake::Shutdown,
            Some(()) = async_check.recv() => Wake::Recovery,
            _ = steady.tick() => Wake::Steady,
            claim = next_claim(&mut requests) => match claim {
                Some(claimed) => Wake::Claim(claimed),
                None => Wake::RequestsClosed,
            },
        };

        match wake {
            Wake::Shutdown => break,
            Wake::RequestsClosed => {
                tracing::debug!("Request-check channel closed");
                requests = None;
                continue;
            }
            Wake::Claim(claimed) => shared.apply_claim(claimed).await,
            Wake::Recovery | Wake::Steady => {}
        }

        if let Some(handle) = shared.try_start_round(wake) {
            in_flight = Some(handle);
        }
    }

    if let Some(handle) = in_flight {
        if !handle.is_finished() {
            tracing::debug!("Waiting for in-flight round before stopping");
        }
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Health round failed");
        }
    }
}

fn non_zero(field: &'static str, value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!(field, fallback_ms = fallback.as_millis() as u64, "Zero ticker interval, using default");
        fallback
    } else {
        value
    }
}

async fn next_claim(requests: &mut Option<mpsc::Receiver<bool>>) -> Option<bool> {
    match requests {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_floor() {
        let floor = Duration::from_millis(600);
        let now = Instant::now();
        let mut times = CheckTimes::default();
        assert!(!times.too_soon(now, floor));

        times.last_started = Some(now);
        assert!(times.too_soon(now + Duration::from_millis(599), floor));
        assert!(!times.too_soon(now + floor, floor));

        times.last_completed = Some(now + Duration::from_millis(500));
        assert!(times.too_soon(now + Duration::from_millis(1000), floor));
        assert!(!times.too_soon(now + Duration::from_millis(1100), floor));
    }

    fn shared_with(transitions: Option<mpsc::Sender<bool>>) -> Arc<Shared> {
        let aggregator = Arc::new(Aggregator::new(Vec::new()));
        Arc::new(Shared {
            store: aggregator.store(),
            aggregator,
            recovery_interval: Duration::from_millis(100),
            checking: Arc::new(Mutex::new(CheckTimes::default())),
            health: Mutex::new(HealthState::Unknown),
            transitions,
            round_completed: Notify::new(),
            closing: watch::Sender::new(false),
        })
    }

    #[tokio::test]
    async fn test_wake_dropped_while_round_in_flight() {
        let shared = shared_with(None);
        let _held = shared.checking.clone().lock_owned().await;
        assert!(shared.try_start_round(Wake::Steady).is_none());
    }

    #[tokio::test]
    async fn test_round_then_immediate_wake_is_debounced() {
        let shared = shared_with(None);
        let handle = shared.try_start_round(Wake::Recovery).unwrap();
        handle.await.unwrap();

        assert!(shared.try_start_round(Wake::Steady).is_none());
        assert_eq!(*shared.health.lock().await, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_claims_publish_only_failures() {
        let (tx, mut rx) = mpsc::channel(4);
        let shared = shared_with(Some(tx));

        shared.apply_round(true).await;
        assert_eq!(rx.recv().await, Some(true));

        shared.apply_claim(true).await;
        shared.apply_claim(false).await;
        assert_eq!(rx.recv().await, Some(false));
        shared.apply_claim(false).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(*shared.health.lock().await, HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_tolerated() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let shared = shared_with(Some(tx));
        shared.apply_round(true).await;
        assert_eq!(*shared.health.lock().await, HealthState::Healthy);
    }

    #[test]
    fn test_zero_interval_falls_back() {
        let fallback = Duration::from_secs(5);
        assert_eq!(non_zero("recovery_interval_ms", Duration::ZERO, fallback), fallback);
        assert_eq!(
            non_zero("recovery_interval_ms", Duration::from_millis(10), fallback),
            Duration::from_millis(10)
        );
    }

    #[tokio::test]
    async fn test_start_with_zero_intervals_does_not_panic() {
        let aggregator = Arc::new(Aggregator::new(Vec::new()));
        let config = TickerConfig {
            interval_ms: 0,
            recovery_interval_ms: 0,
            probe_timeout_ms: None,
        };
        let ticker = Ticker::start(aggregator, &config, None, None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticker.state().await, HealthState::Unknown);
        ticker.close().await;
    }

    #[tokio::test]
    async fn test_closing_releases_blocked_publish() {
        let (tx, _rx) = mpsc::channel(1);
        let shared = shared_with(Some(tx));
        shared.apply_round(true).await;

        let blocked = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.apply_claim(false).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        shared.closing.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*shared.health.lock().await, HealthState::Unhealthy);
    }
}
