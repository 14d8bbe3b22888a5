//! Published health snapshot.
//!
//! A snapshot maps failing probe names to their error. A probe absent from the
//! map was healthy in the last completed round. Snapshots are immutable; each
//! round publishes a new one with an atomic pointer swap so readers never wait
//! on a round in progress.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::health::probe::ProbeError;

/// Outcome of one completed round: the set of failing probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    failures: BTreeMap<String, ProbeError>,
}

impl Snapshot {
    pub fn new(failures: BTreeMap<String, ProbeError>) -> Self {
        Self { failures }
    }

    /// True when every probe succeeded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn get(&self, name: &str) -> Option<&ProbeError> {
        self.failures.get(name)
    }

    /// Failing probes, ordered by name.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ProbeError)> {
        self.failures.iter().map(|(name, err)| (name.as_str(), err))
    }

    /// Human readable failure lines, ordered by probe name.
    pub fn messages(&self) -> Vec<String> {
        self.failures()
            .map(|(name, err)| format!("unsuccessful healthcheck for {}: {}", name, err))
            .collect()
    }
}

/// Single-writer, many-reader holder of the latest [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    current: Arc<ArcSwap<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Snapshot::default())),
        }
    }

    /// The most recently published snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the published snapshot wholesale.
    pub(crate) fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(snapshot.clone());
        snapshot
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
