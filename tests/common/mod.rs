//! Shared utilities for ticker and endpoint integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use health_ticker::config::TickerConfig;
use health_ticker::{Probe, ProbeError};
use tokio::sync::mpsc;

/// Probe that fails for its first `fail_first` calls and records every call window.
#[allow(dead_code)]
pub struct ScriptedProbe {
    name: String,
    fail_first: usize,
    delay: Duration,
    calls: AtomicUsize,
    windows: Mutex<Vec<(Instant, Instant)>>,
}

#[allow(dead_code)]
impl ScriptedProbe {
    pub fn new(name: &str, fail_first: usize) -> Arc<Self> {
        Self::with_delay(name, fail_first, Duration::ZERO)
    }

    pub fn healthy(name: &str) -> Arc<Self> {
        Self::new(name, 0)
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(name, usize::MAX)
    }

    pub fn with_delay(name: &str, fail_first: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_first,
            delay,
            calls: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Start/end instants of every completed call, in call order.
    pub fn windows(&self) -> Vec<(Instant, Instant)> {
        self.windows.lock().unwrap().clone()
    }

    pub fn starts(&self) -> Vec<Instant> {
        self.windows().into_iter().map(|(start, _)| start).collect()
    }
}

impl Probe for ScriptedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> Result<(), ProbeError> {
        let start = Instant::now();
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.windows.lock().unwrap().push((start, Instant::now()));

        if call < self.fail_first {
            Err(ProbeError::failed(format!("scripted failure #{}", call + 1)))
        } else {
            Ok(())
        }
    }
}

#[allow(dead_code)]
pub fn ticker_config(interval_ms: u64, recovery_interval_ms: u64) -> TickerConfig {
    TickerConfig {
        interval_ms,
        recovery_interval_ms,
        probe_timeout_ms: None,
    }
}

/// Drain every transition that arrives within `window`.
#[allow(dead_code)]
pub async fn collect_transitions(rx: &mut mpsc::Receiver<bool>, window: Duration) -> Vec<bool> {
    let deadline = tokio::time::Instant::now() + window;
    let mut seen = Vec::new();
    while let Ok(Some(edge)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        seen.push(edge);
    }
    seen
}

/// Wait for the next transition, failing the test after `limit`.
#[allow(dead_code)]
pub async fn next_transition(rx: &mut mpsc::Receiver<bool>, limit: Duration) -> bool {
    tokio::time::timeout(limit, rx.recv())
        .await
        .expect("no transition in time")
        .expect("transition channel closed")
}
