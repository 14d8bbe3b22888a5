//! Adaptive dependency health monitor.
//!
//! Polls a fixed set of probes, publishes the failing set as an atomic
//! snapshot, tracks overall health with edge-triggered notifications, and
//! serves the snapshot over `GET /healthcheck`.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::MonitorConfig;
pub use error::{Error, Result};
pub use health::{Aggregator, Probe, ProbeError, Snapshot, SnapshotStore, Ticker};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
