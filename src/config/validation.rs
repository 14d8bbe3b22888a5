//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Detect duplicate probe names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - A steady interval shorter than the recovery interval is only warned about

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MonitorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} is not a socket address: {value}")]
    InvalidAddress { field: String, value: String },

    #[error("probe #{index} has an empty name")]
    EmptyProbeName { index: usize },

    #[error("probe name {0:?} is used more than once")]
    DuplicateProbe(String),

    #[error("probe {0:?} has an empty address")]
    EmptyProbeAddress(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration { field: "server.request_timeout_secs" });
    }

    if config.ticker.interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "ticker.interval_ms" });
    }
    if config.ticker.recovery_interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "ticker.recovery_interval_ms" });
    }
    if config.ticker.probe_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroDuration { field: "ticker.probe_timeout_ms" });
    }
    if config.ticker.interval_ms < config.ticker.recovery_interval_ms {
        tracing::warn!(
            interval_ms = config.ticker.interval_ms,
            recovery_interval_ms = config.ticker.recovery_interval_ms,
            "Steady interval is shorter than recovery interval"
        );
    }

    let mut seen = HashSet::new();
    for (index, probe) in config.probes.iter().enumerate() {
        if probe.name.trim().is_empty() {
            errors.push(ValidationError::EmptyProbeName { index });
        } else if !seen.insert(probe.name.as_str()) {
            errors.push(ValidationError::DuplicateProbe(probe.name.clone()));
        }
        if probe.address.trim().is_empty() {
            errors.push(ValidationError::EmptyProbeAddress(probe.name.clone()));
        }
        if probe.connect_timeout_ms == 0 {
            errors.push(ValidationError::ZeroDuration { field: "probes.connect_timeout_ms" });
        }
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
