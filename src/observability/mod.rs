//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! aggregator, ticker, server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Logging and metrics are write-only sinks; nothing reads them back
//! - Metrics are cheap when no recorder is installed

pub mod logging;
pub mod metrics;
