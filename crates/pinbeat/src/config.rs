//! Waveform configuration and validation.

use std::time::Duration;

use crate::error::ConfigError;

/// Validated heartbeat waveform parameters.
///
/// A `PulseConfig` can only be obtained through [`PulseConfig::validate`],
/// so holding one is proof that all four invariants hold:
///
/// - `period_ms >= 2`
/// - `rest_ms >= 1`
/// - `rest_ms >= period_ms / 2` (the active phase may not exceed half
///   the period)
/// - `rest_ms <= period_ms`
///
/// The struct is immutable after validation and contains only
/// primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseConfig {
    period_ms: u32,
    pulse_width_ms: u32,
    rest_ms: u32,
}

impl PulseConfig {
    /// Validate raw period and pulse-width values into a config.
    ///
    /// `rest_ms` is derived as `period_ms - pulse_width_ms` with
    /// explicit underflow detection; a pulse width wider than the
    /// period is rejected, never wrapped.
    ///
    /// The invariants are checked in a fixed order and the first
    /// violation determines the reported variant.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] variant for the first violated
    /// invariant. On failure no partial state is created and the
    /// scheduler must not be started.
    pub fn validate(period_ms: u32, pulse_width_ms: u32) -> Result<Self, ConfigError> {
        if period_ms < 2 {
            return Err(ConfigError::PeriodTooShort { period_ms });
        }

        // checked_sub covers both rest == 0 and pulse width > period.
        let rest_ms = match period_ms.checked_sub(pulse_width_ms) {
            Some(rest_ms) if rest_ms >= 1 => rest_ms,
            _ => {
                return Err(ConfigError::RestTooShort {
                    period_ms,
                    pulse_width_ms,
                });
            }
        };

        if rest_ms < period_ms / 2 {
            return Err(ConfigError::RestBelowHalfPeriod { period_ms, rest_ms });
        }

        if rest_ms > period_ms {
            return Err(ConfigError::RestExceedsPeriod { period_ms, rest_ms });
        }

        Ok(Self {
            period_ms,
            pulse_width_ms,
            rest_ms,
        })
    }

    /// Total waveform period in milliseconds.
    #[must_use]
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Duration of the active (asserted) phase in milliseconds.
    #[must_use]
    pub fn pulse_width_ms(&self) -> u32 {
        self.pulse_width_ms
    }

    /// Duration of the inactive (rest) phase in milliseconds.
    #[must_use]
    pub fn rest_ms(&self) -> u32 {
        self.rest_ms
    }

    /// Active phase as a [`Duration`].
    #[must_use]
    pub fn pulse_width(&self) -> Duration {
        Duration::from_millis(u64::from(self.pulse_width_ms))
    }

    /// Rest phase as a [`Duration`].
    #[must_use]
    pub fn rest(&self) -> Duration {
        Duration::from_millis(u64::from(self.rest_ms))
    }
}
