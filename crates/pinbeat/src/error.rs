//! Error types for the heartbeat scheduler.
//!
//! Startup errors (`ConfigError`, `AcquisitionError`) are fatal and
//! reported synchronously; per-toggle errors (`SinkError`,
//! `DispatchError`) are isolated and never stop the waveform.

use thiserror::Error;

/// Errors rejecting an invalid waveform configuration.
///
/// The variants correspond to the four configuration invariants,
/// checked in a fixed order; the first violated invariant is the one
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The total period is shorter than the 2ms minimum.
    #[error("heartbeat period must be at least 2ms (got {period_ms}ms)")]
    PeriodTooShort {
        /// The rejected period.
        period_ms: u32,
    },

    /// The rest phase would be shorter than 1ms, including the case
    /// where the pulse width exceeds the period entirely.
    #[error(
        "rest phase must be at least 1ms (period {period_ms}ms, pulse width {pulse_width_ms}ms)"
    )]
    RestTooShort {
        /// The configured period.
        period_ms: u32,
        /// The pulse width that leaves no rest phase.
        pulse_width_ms: u32,
    },

    /// The active phase may not exceed half the period.
    #[error("rest phase {rest_ms}ms is below half the period ({period_ms}ms)")]
    RestBelowHalfPeriod {
        /// The configured period.
        period_ms: u32,
        /// The derived rest phase.
        rest_ms: u32,
    },

    /// The rest phase may not exceed the period.
    #[error("rest phase {rest_ms}ms exceeds the period ({period_ms}ms)")]
    RestExceedsPeriod {
        /// The configured period.
        period_ms: u32,
        /// The derived rest phase.
        rest_ms: u32,
    },
}

/// A clock or dispatcher resource failed to initialize during
/// [`start`](crate::scheduler::HeartbeatBuilder::start).
///
/// By the time this error is returned, every resource acquired before
/// the failing step has already been released; no pulse was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to acquire {resource}: {reason}")]
pub struct AcquisitionError {
    /// Which facility failed (`"dispatcher"`, `"clock timer"`, ...).
    pub resource: &'static str,
    /// Human-readable failure cause.
    pub reason: String,
}

impl AcquisitionError {
    /// Create an acquisition error for the named resource.
    #[must_use]
    pub fn new(resource: &'static str, reason: impl Into<String>) -> Self {
        Self {
            resource,
            reason: reason.into(),
        }
    }
}

/// A single hardware write failed.
///
/// Non-fatal to the scheduler: the toggle that observed it still
/// re-arms the next deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware write failed: {reason}")]
pub struct SinkError {
    /// Human-readable failure cause.
    pub reason: String,
}

impl SinkError {
    /// Create a sink error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The dispatcher rejected a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The bounded submission queue is full.
    #[error("dispatcher queue is full")]
    QueueFull,

    /// The dispatcher has been shut down.
    #[error("dispatcher is shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::PeriodTooShort { period_ms: 1 };
        assert_eq!(
            err.to_string(),
            "heartbeat period must be at least 2ms (got 1ms)"
        );

        let err = ConfigError::RestBelowHalfPeriod {
            period_ms: 10,
            rest_ms: 4,
        };
        assert!(err.to_string().contains("below half the period"));
    }

    #[test]
    fn test_acquisition_error_names_resource() {
        let err = AcquisitionError::new("dispatcher", "thread spawn failed");
        assert!(err.to_string().contains("dispatcher"));
        assert!(err.to_string().contains("thread spawn failed"));
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::new("bus stall");
        assert_eq!(err.to_string(), "hardware write failed: bus stall");
    }

    #[test]
    fn test_dispatch_error_display() {
        assert_eq!(DispatchError::QueueFull.to_string(), "dispatcher queue is full");
        assert_eq!(DispatchError::ShutDown.to_string(), "dispatcher is shut down");
    }
}
