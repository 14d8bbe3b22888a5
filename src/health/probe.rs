//! Dependency probes.
//!
//! # Responsibilities
//! - Define the blocking probe contract consumed by the aggregator
//! - Provide a closure adapter and a TCP connect probe
//!
//! # Design Decisions
//! - `probe()` is synchronous and may block; callers run it on the blocking pool
//! - Retry/backoff, if any, is internal to each probe

use std::fmt;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;

/// Reason a single probe reported its dependency as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("{target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("probe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("probe panicked")]
    Panicked,

    #[error("{0}")]
    Failed(String),
}

impl ProbeError {
    /// Build a free-form failure from anything printable.
    pub fn failed(message: impl fmt::Display) -> Self {
        ProbeError::Failed(message.to_string())
    }
}

/// A single dependency health check.
pub trait Probe: Send + Sync + 'static {
    /// Name used as the snapshot key and in error messages.
    fn name(&self) -> &str;

    /// Check the dependency. `Ok(())` means healthy.
    fn probe(&self) -> Result<(), ProbeError>;
}

/// Adapts a closure into a [`Probe`].
pub struct FnProbe<F> {
    name: String,
    check: F,
}

impl<F> FnProbe<F>
where
    F: Fn() -> Result<(), ProbeError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Probe for FnProbe<F>
where
    F: Fn() -> Result<(), ProbeError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> Result<(), ProbeError> {
        (self.check)()
    }
}

impl<F> fmt::Debug for FnProbe<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProbe").field("name", &self.name).finish()
    }
}

/// Probe that succeeds when a TCP connection to `address` can be opened.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    name: String,
    address: String,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            connect_timeout,
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, ProbeError> {
        let addrs: Vec<SocketAddr> = self
            .address
            .to_socket_addrs()
            .map_err(|e| self.unreachable(e))?
            .collect();

        if addrs.is_empty() {
            return Err(self.unreachable("address resolved to nothing"));
        }
        Ok(addrs)
    }

    fn unreachable(&self, reason: impl fmt::Display) -> ProbeError {
        ProbeError::Unreachable {
            target: self.address.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Probe for TcpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self) -> Result<(), ProbeError> {
        let mut last_error = None;
        for addr in self.resolve()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                ProbeError::TimedOut(self.connect_timeout)
            }
            Some(e) => self.unreachable(e),
            None => self.unreachable("no address attempted"),
        })
    }
}
