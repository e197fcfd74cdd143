//! Point-in-time queries over an ordered sample slice.
//!
//! Hover and scrub queries arrive at arbitrary timestamps, not only at
//! recorded sample times. Level is linearly interpolated between the
//! bracketing samples; motor state is a step function that holds the last
//! known value. Both locate the bracketing pair with a binary search, so a
//! query costs O(log n) regardless of buffer size.
//!
//! Every function expects `samples` sorted by non-decreasing timestamp, which
//! [`HistoryBuffer`](crate::HistoryBuffer) guarantees.

use crate::error::{TankError, TankResult};
use crate::sample::{Sample, TimestampMillis};

pub mod bands;

pub use bands::{Band, Bands, segment_bands};

/// Position of a query timestamp relative to the recorded samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Bracket<'a> {
    /// At or before the first sample.
    Before(&'a Sample),
    /// At or after the last sample.
    After(&'a Sample),
    /// Strictly inside the recorded range, between two adjacent samples.
    Between(&'a Sample, &'a Sample),
}

/// Locates the samples surrounding `timestamp`.
///
/// Inside the range, `a` is the latest sample at or before `timestamp` and `b`
/// is its successor, so duplicate timestamps resolve to the newest duplicate.
///
/// # Errors
///
/// Returns [`TankError::NoData`] when `samples` is empty.
pub fn bracket(samples: &[Sample], timestamp: TimestampMillis) -> TankResult<Bracket<'_>> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(TankError::NoData),
    };

    if timestamp <= first.timestamp {
        return Ok(Bracket::Before(first));
    }
    if timestamp >= last.timestamp {
        return Ok(Bracket::After(last));
    }

    // first.timestamp < timestamp < last.timestamp, so 1 <= upper < len.
    let upper = samples.partition_point(|sample| sample.timestamp <= timestamp);
    Ok(Bracket::Between(&samples[upper - 1], &samples[upper]))
}

/// Level at `timestamp`, clamped to the boundary samples outside the range.
///
/// # Errors
///
/// Returns [`TankError::NoData`] when `samples` is empty.
pub fn level_at(samples: &[Sample], timestamp: TimestampMillis) -> TankResult<f64> {
    Ok(match bracket(samples, timestamp)? {
        Bracket::Before(sample) | Bracket::After(sample) => sample.level,
        Bracket::Between(a, b) => interpolate(a, b, timestamp),
    })
}

/// Motor state of the latest sample at or before `timestamp`.
///
/// Queries before the first sample report the first sample's state. The value
/// is never blended: a pump is either running or not.
///
/// # Errors
///
/// Returns [`TankError::NoData`] when `samples` is empty.
pub fn motor_at(samples: &[Sample], timestamp: TimestampMillis) -> TankResult<bool> {
    Ok(match bracket(samples, timestamp)? {
        Bracket::Before(sample) | Bracket::After(sample) | Bracket::Between(sample, _) => {
            sample.motor_on
        }
    })
}

/// Tooltip payload for a hover position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoverReadout {
    pub timestamp: TimestampMillis,
    pub level: f64,
    pub motor_on: bool,
}

/// Resolves both level and motor state at `timestamp`.
///
/// # Errors
///
/// Returns [`TankError::NoData`] when `samples` is empty.
pub fn readout(samples: &[Sample], timestamp: TimestampMillis) -> TankResult<HoverReadout> {
    Ok(HoverReadout {
        timestamp,
        level: level_at(samples, timestamp)?,
        motor_on: motor_at(samples, timestamp)?,
    })
}

#[allow(clippy::cast_precision_loss)]
fn interpolate(a: &Sample, b: &Sample, timestamp: TimestampMillis) -> f64 {
    let span = b.timestamp.saturating_sub(a.timestamp);
    if span == 0 {
        return a.level;
    }
    let offset = timestamp.saturating_sub(a.timestamp);
    let t = offset as f64 / span as f64;
    a.level + (b.level - a.level) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: TimestampMillis, level: f64, motor_on: bool) -> Sample {
        Sample::new(timestamp, level, motor_on)
    }

    #[test]
    fn empty_history_reports_no_data() {
        assert_eq!(level_at(&[], 10), Err(TankError::NoData));
        assert_eq!(motor_at(&[], 10), Err(TankError::NoData));
        assert_eq!(readout(&[], 10), Err(TankError::NoData));
    }

    #[test]
    fn midpoint_interpolates_linearly() {
        let samples = [sample(1_000, 100.0, false), sample(1_010, 200.0, true)];
        assert_eq!(level_at(&samples, 1_005), Ok(150.0));
    }

    #[test]
    fn outside_range_clamps_to_boundary_samples() {
        let samples = [
            sample(100, 40.0, true),
            sample(200, 60.0, false),
            sample(300, 80.0, true),
        ];

        assert_eq!(level_at(&samples, 0), Ok(40.0));
        assert_eq!(motor_at(&samples, 0), Ok(true));
        assert_eq!(level_at(&samples, 10_000), Ok(80.0));
        assert_eq!(motor_at(&samples, 10_000), Ok(true));
    }

    #[test]
    fn motor_holds_last_known_state() {
        let samples = [
            sample(0, 10.0, false),
            sample(10, 10.0, true),
            sample(20, 10.0, false),
        ];

        assert_eq!(motor_at(&samples, 9), Ok(false));
        assert_eq!(motor_at(&samples, 10), Ok(true));
        assert_eq!(motor_at(&samples, 19), Ok(true));
        assert_eq!(motor_at(&samples, 20), Ok(false));
    }

    #[test]
    fn motor_after_last_sample_uses_last_state() {
        let samples = [sample(0, 1.0, false), sample(10, 1.0, true)];
        assert_eq!(motor_at(&samples, 10), Ok(true));
        assert_eq!(motor_at(&samples, 50), Ok(true));
    }

    #[test]
    fn exact_match_returns_sample_value() {
        let samples = [
            sample(0, 10.0, false),
            sample(10, 30.0, false),
            sample(20, 50.0, false),
        ];
        assert_eq!(level_at(&samples, 10), Ok(30.0));
    }

    #[test]
    fn duplicate_timestamps_resolve_to_newest_entry() {
        let samples = [
            sample(0, 10.0, false),
            sample(10, 20.0, false),
            sample(10, 25.0, true),
            sample(20, 45.0, true),
        ];

        assert_eq!(level_at(&samples, 10), Ok(25.0));
        assert_eq!(motor_at(&samples, 10), Ok(true));
        assert_eq!(level_at(&samples, 15), Ok(35.0));
    }

    #[test]
    fn single_sample_answers_every_query() {
        let samples = [sample(500, 75.0, true)];
        assert_eq!(level_at(&samples, 0), Ok(75.0));
        assert_eq!(level_at(&samples, 500), Ok(75.0));
        assert_eq!(level_at(&samples, 900), Ok(75.0));
        assert_eq!(motor_at(&samples, 900), Ok(true));
    }

    #[test]
    fn degenerate_pair_avoids_division_by_zero() {
        let a = sample(10, 5.0, false);
        let b = sample(10, 9.0, false);
        assert_eq!(interpolate(&a, &b, 10), 5.0);
    }

    #[test]
    fn bracket_classifies_positions() {
        let samples = [sample(0, 0.0, false), sample(10, 1.0, false)];
        assert!(matches!(bracket(&samples, 0), Ok(Bracket::Before(_))));
        assert!(matches!(bracket(&samples, 5), Ok(Bracket::Between(a, b)) if a.timestamp == 0 && b.timestamp == 10));
        assert!(matches!(bracket(&samples, 10), Ok(Bracket::After(_))));
    }

    #[test]
    fn readout_combines_level_and_motor() {
        let samples = [sample(0, 100.0, true), sample(60_000, 220.0, true)];
        let readout = readout(&samples, 30_000).unwrap();
        assert_eq!(
            readout,
            HoverReadout {
                timestamp: 30_000,
                level: 160.0,
                motor_on: true,
            }
        );
    }
}
