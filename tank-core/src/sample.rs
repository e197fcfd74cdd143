//! Telemetry sample value type and level helpers.

/// Canonical timestamp units for telemetry samples (milliseconds since the
/// host's epoch).
pub type TimestampMillis = u64;

/// One timestamped observation of tank level and pump state.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    #[cfg_attr(feature = "serde", serde(rename = "ts"))]
    pub timestamp: TimestampMillis,
    pub level: f64,
    #[cfg_attr(feature = "serde", serde(rename = "motor"))]
    pub motor_on: bool,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(timestamp: TimestampMillis, level: f64, motor_on: bool) -> Self {
        Self {
            timestamp,
            level,
            motor_on,
        }
    }

    /// Returns a copy with the level clamped into `[0, capacity]`.
    #[must_use]
    pub fn clamped(self, capacity: f64) -> Self {
        Self {
            level: clamp_level(self.level, capacity),
            ..self
        }
    }
}

/// Clamps a raw level reading into `[0, capacity]`.
///
/// `NaN` readings collapse to an empty tank rather than propagating through
/// the history.
#[must_use]
pub fn clamp_level(level: f64, capacity: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, capacity)
    }
}

/// Rounds a non-negative level to the nearest whole liter.
///
/// `core` has no `f64::round`; levels are never negative once clamped, so
/// half-up truncation matches `round` for every value the core produces.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn round_liters(level: f64) -> f64 {
    if level <= 0.0 {
        return 0.0;
    }
    ((level + 0.5) as u64) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_level_bounds_noisy_readings() {
        assert_eq!(clamp_level(-12.0, 2000.0), 0.0);
        assert_eq!(clamp_level(2500.0, 2000.0), 2000.0);
        assert_eq!(clamp_level(f64::NAN, 2000.0), 0.0);
        assert_eq!(clamp_level(f64::INFINITY, 2000.0), 2000.0);
        assert_eq!(clamp_level(812.5, 2000.0), 812.5);
    }

    #[test]
    fn round_liters_matches_half_up() {
        assert_eq!(round_liters(899.5), 900.0);
        assert_eq!(round_liters(899.49), 899.0);
        assert_eq!(round_liters(0.0), 0.0);
        assert_eq!(round_liters(-3.0), 0.0);
    }

    #[test]
    fn clamped_sample_keeps_timestamp_and_motor() {
        let sample = Sample::new(42, 2_400.0, true).clamped(2_000.0);
        assert_eq!(sample, Sample::new(42, 2_000.0, true));
    }
}
