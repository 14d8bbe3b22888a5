//! Overall health state machine.
//!
//! # States
//! - Unknown: no round has completed yet
//! - Healthy: the last round had no failures
//! - Unhealthy: the last round failed, or a caller reported a failure
//!
//! # State Transitions
//! ```text
//! Unknown   → Healthy:   round succeeds            (edge: true)
//! Unknown   → Unhealthy: round fails               (no edge)
//! Healthy   → Unhealthy: round fails / fail-fast   (edge: false)
//! Unhealthy → Healthy:   round succeeds            (edge: true)
//! ```
//!
//! Unknown counts as not-OK, so it polls on the recovery cadence and leaving it
//! for Unhealthy is not an edge.

/// Derived overall health.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthState {
    #[default]
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl HealthState {
    pub fn is_ok(self) -> bool {
        self == HealthState::Healthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }

    /// Apply the outcome of a completed round.
    ///
    /// Returns the edge to publish, if the OK flag flipped.
    pub fn observe_round(&mut self, healthy: bool) -> Option<bool> {
        let was_ok = self.is_ok();
        *self = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        (was_ok != healthy).then_some(healthy)
    }

    /// Apply a health claim from outside the scheduler.
    ///
    /// Failures are believed immediately; success claims are ignored until a
    /// round confirms them.
    pub fn observe_claim(&mut self, claimed: bool) -> Option<bool> {
        if claimed || !self.is_ok() {
            return None;
        }
        *self = HealthState::Unhealthy;
        Some(false)
    }
}
