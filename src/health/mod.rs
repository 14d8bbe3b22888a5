//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! ticker.rs (recovery loop, steady interval, request-check channel)
//!     → debounce
//!     → aggregator.rs runs every probe.rs concurrently
//!     → snapshot.rs publishes the failing set
//!     → state.rs derives healthy/unhealthy from the snapshot
//!     → edge published on the transition channel
//!
//! HTTP boundary:
//!     GET /healthcheck → reads snapshot.rs, never starts a round
//! ```
//!
//! # Design Decisions
//! - The probe set is fixed at construction
//! - Overall health is edge-triggered: steady polls never notify
//! - Failures reported from outside are trusted at once, recoveries are not

pub mod aggregator;
pub mod probe;
pub mod snapshot;
pub mod state;
pub mod ticker;

pub use aggregator::Aggregator;
pub use probe::{FnProbe, Probe, ProbeError, TcpProbe};
pub use snapshot::{Snapshot, SnapshotStore};
pub use state::HealthState;
pub use ticker::Ticker;
