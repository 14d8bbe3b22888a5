//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!     → startup builds probes, aggregator, ticker and server from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; probes are fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{MonitorConfig, ObservabilityConfig, ProbeConfig, ServerConfig, TickerConfig};
pub use validation::ValidationError;
