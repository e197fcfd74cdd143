//! Error taxonomy shared by the telemetry core.
//!
//! Configuration is rejected at construction and queries against an empty
//! history report [`TankError::NoData`]. A host that runs out of timer or
//! listener slots reports [`TankError::HostCapacityExhausted`]. Noisy telemetry
//! values are never errors; they are clamped where they enter the state machine.

use thiserror::Error;

/// Detail attached to [`TankError::InvalidConfiguration`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigIssue {
    /// Tank capacity was zero, negative or not a finite number.
    NonPositiveCapacity,
    /// Inflow or outflow rate was negative or not finite.
    InvalidFlowRate,
    /// A level threshold percentage was not finite.
    InvalidThreshold,
}

impl ConfigIssue {
    /// Short label used in host diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ConfigIssue::NonPositiveCapacity => "capacity must be a positive number of liters",
            ConfigIssue::InvalidFlowRate => "flow rates must be finite and non-negative",
            ConfigIssue::InvalidThreshold => "level thresholds must be finite percentages",
        }
    }
}

/// Failures reported by the telemetry core.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TankError {
    /// Construction parameters were rejected; no widget was created.
    #[error("invalid configuration: {}", .0.label())]
    InvalidConfiguration(ConfigIssue),
    /// A time query ran before the history held any sample.
    #[error("no telemetry samples recorded")]
    NoData,
    /// The host runtime had no free timer or listener slot.
    #[error("host runtime has no free registration slot")]
    HostCapacityExhausted,
}

/// Result alias used across the core.
pub type TankResult<T> = Result<T, TankError>;
