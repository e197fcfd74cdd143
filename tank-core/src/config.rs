//! Construction parameters for the dashboard widget.
//!
//! Every field has a default matching the stock demo tank; hosts override the
//! handful they care about and call [`WidgetConfig::validate`] (the widget
//! constructors do this for them).

use crate::error::{ConfigIssue, TankError};
use crate::sample::round_liters;

/// Default tank capacity in liters.
pub const DEFAULT_CAPACITY_LITERS: f64 = 2_000.0;
/// Default pump inflow while the motor runs (liters per minute).
pub const DEFAULT_INFLOW_LPM: f64 = 120.0;
/// Default drain rate while the motor is off (liters per minute).
pub const DEFAULT_OUTFLOW_LPM: f64 = 20.0;
/// Default low-level badge threshold (percent of capacity).
pub const DEFAULT_LOW_LEVEL_PCT: f64 = 20.0;
/// Default near-full badge threshold (percent of capacity).
pub const DEFAULT_HIGH_LEVEL_PCT: f64 = 95.0;
/// Width below which the layout stacks panels vertically.
pub const DEFAULT_NARROW_BREAKPOINT: u16 = 1_100;
/// Fraction of capacity used as the simulated starting level.
pub const UNCONTROLLED_START_FRACTION: f64 = 0.45;

/// Pump flow rates used by the uncontrolled simulation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlowRates {
    /// Liters per minute added while the motor runs.
    pub inflow_lpm: f64,
    /// Liters per minute drained while the motor is off.
    pub outflow_lpm: f64,
}

impl FlowRates {
    /// Creates a flow-rate pair.
    #[must_use]
    pub const fn new(inflow_lpm: f64, outflow_lpm: f64) -> Self {
        Self {
            inflow_lpm,
            outflow_lpm,
        }
    }

    /// Signed level change for one simulated second.
    #[must_use]
    pub fn per_second_delta(&self, motor_on: bool) -> f64 {
        if motor_on {
            self.inflow_lpm / 60.0
        } else {
            -self.outflow_lpm / 60.0
        }
    }

    fn is_valid(&self) -> bool {
        self.inflow_lpm.is_finite()
            && self.outflow_lpm.is_finite()
            && self.inflow_lpm >= 0.0
            && self.outflow_lpm >= 0.0
    }
}

impl Default for FlowRates {
    fn default() -> Self {
        Self::new(DEFAULT_INFLOW_LPM, DEFAULT_OUTFLOW_LPM)
    }
}

/// Low/high level badges expressed as percent of capacity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LevelThresholds {
    pub low_pct: f64,
    pub high_pct: f64,
}

impl LevelThresholds {
    /// Creates a threshold pair.
    #[must_use]
    pub const fn new(low_pct: f64, high_pct: f64) -> Self {
        Self { low_pct, high_pct }
    }

    /// Returns `true` when `pct` sits at or under the low threshold.
    #[must_use]
    pub fn is_low(&self, pct: f64) -> bool {
        pct <= self.low_pct
    }

    /// Returns `true` when `pct` sits at or over the high threshold.
    #[must_use]
    pub fn is_high(&self, pct: f64) -> bool {
        pct >= self.high_pct
    }

    /// Converts both thresholds into liters for the given capacity.
    #[must_use]
    pub fn absolute(&self, capacity: f64) -> (f64, f64) {
        (
            self.low_pct / 100.0 * capacity,
            self.high_pct / 100.0 * capacity,
        )
    }

    fn is_valid(&self) -> bool {
        self.low_pct.is_finite() && self.high_pct.is_finite()
    }
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_LEVEL_PCT, DEFAULT_HIGH_LEVEL_PCT)
    }
}

/// How external readings are copied into the history while controlled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum MirrorPolicy {
    /// Append only when the `(level, motor)` pair differs from the last
    /// mirrored pair.
    #[default]
    OnChange,
    /// Append on every update cycle, even when nothing changed.
    EveryUpdate,
}

/// Full widget configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WidgetConfig {
    /// Tank capacity in liters.
    pub capacity: f64,
    pub flow: FlowRates,
    pub thresholds: LevelThresholds,
    /// Whether motor on/off bands are computed for the chart overlay.
    pub show_band_overlay: bool,
    /// Whether threshold lines are drawn on the chart.
    pub show_thresholds: bool,
    pub mirror_policy: MirrorPolicy,
    pub narrow_breakpoint: u16,
}

impl WidgetConfig {
    /// Default configuration with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: f64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Checks the parameters the simulation depends on.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::InvalidConfiguration`] for a non-positive capacity,
    /// negative or non-finite flow rates, or non-finite thresholds.
    pub fn validate(&self) -> Result<(), TankError> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(TankError::InvalidConfiguration(
                ConfigIssue::NonPositiveCapacity,
            ));
        }
        if !self.flow.is_valid() {
            return Err(TankError::InvalidConfiguration(ConfigIssue::InvalidFlowRate));
        }
        if !self.thresholds.is_valid() {
            return Err(TankError::InvalidConfiguration(
                ConfigIssue::InvalidThreshold,
            ));
        }
        Ok(())
    }

    /// Level the simulation starts from when no reading was supplied.
    #[must_use]
    pub fn default_start_level(&self) -> f64 {
        round_liters(self.capacity * UNCONTROLLED_START_FRACTION)
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY_LITERS,
            flow: FlowRates::default(),
            thresholds: LevelThresholds::default(),
            show_band_overlay: false,
            show_thresholds: true,
            mirror_policy: MirrorPolicy::default(),
            narrow_breakpoint: DEFAULT_NARROW_BREAKPOINT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_capacity() {
        for capacity in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = WidgetConfig::with_capacity(capacity);
            assert_eq!(
                config.validate(),
                Err(TankError::InvalidConfiguration(
                    ConfigIssue::NonPositiveCapacity
                ))
            );
        }
    }

    #[test]
    fn rejects_negative_flow() {
        let config = WidgetConfig {
            flow: FlowRates::new(120.0, -1.0),
            ..WidgetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(TankError::InvalidConfiguration(ConfigIssue::InvalidFlowRate))
        );
    }

    #[test]
    fn default_flow_moves_two_liters_per_second_when_filling() {
        let flow = FlowRates::default();
        assert!((flow.per_second_delta(true) - 2.0).abs() < 1e-12);
        assert!((flow.per_second_delta(false) + 20.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let thresholds = LevelThresholds::default();
        assert!(thresholds.is_low(20.0));
        assert!(!thresholds.is_low(20.01));
        assert!(thresholds.is_high(95.0));
        assert!(!thresholds.is_high(94.99));
        let (low, high) = thresholds.absolute(2_000.0);
        assert!((low - 400.0).abs() < 1e-9);
        assert!((high - 1_900.0).abs() < 1e-9);
    }

    #[test]
    fn default_start_level_rounds_to_liters() {
        assert_eq!(WidgetConfig::default().default_start_level(), 900.0);
        assert_eq!(WidgetConfig::with_capacity(1_001.0).default_start_level(), 450.0);
    }
}
