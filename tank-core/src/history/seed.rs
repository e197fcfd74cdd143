//! Synthetic history used when the host supplies none.
//!
//! Twelve samples spaced 2.5 minutes apart cover the previous half hour with a
//! gentle level wobble and an on/off motor pattern, followed by one sample a
//! minute before `now` so the chart has something to draw on first render.

use heapless::Vec;

use crate::sample::{Sample, TimestampMillis, round_liters};

/// Number of samples produced by [`synthesize_seed`].
pub const SEED_SAMPLE_COUNT: usize = 13;

/// Spacing between the synthesized half-hour samples.
pub const SEED_SPACING_MS: TimestampMillis = 150_000;

/// Offset of the final synthesized sample before `now`.
pub const SEED_TAIL_OFFSET_MS: TimestampMillis = 60_000;

/// Fixed-capacity list of seed samples.
pub type SeedSamples = Vec<Sample, SEED_SAMPLE_COUNT>;

/// Builds the default seed history ending one minute before `now`.
///
/// Timestamps saturate at zero for hosts whose clock starts near the epoch.
#[must_use]
pub fn synthesize_seed(now: TimestampMillis, capacity: f64) -> SeedSamples {
    let mut seed = SeedSamples::new();

    for step in (1..=12u32).rev() {
        let timestamp = now.saturating_sub(u64::from(step) * SEED_SPACING_MS);
        let fraction = 0.35 + 0.01 * f64::from(step % 7);
        let level = round_liters(capacity * fraction);
        let _ = seed.push(Sample::new(timestamp, level, step % 3 == 0));
    }

    let tail = Sample::new(
        now.saturating_sub(SEED_TAIL_OFFSET_MS),
        round_liters(capacity * 0.46),
        false,
    );
    let _ = seed.push(tail);

    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_spans_previous_half_hour() {
        let now = 10_000_000;
        let seed = synthesize_seed(now, 2_000.0);

        assert_eq!(seed.len(), SEED_SAMPLE_COUNT);
        assert_eq!(seed[0].timestamp, now - 12 * SEED_SPACING_MS);
        assert_eq!(seed[11].timestamp, now - SEED_SPACING_MS);
        assert_eq!(seed[12], Sample::new(now - 60_000, 920.0, false));
        assert!(seed.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn seed_levels_and_motor_follow_step_pattern() {
        let seed = synthesize_seed(5_000_000, 2_000.0);

        // step 12: 12 % 7 == 5, 12 % 3 == 0
        assert_eq!(seed[0].level, 800.0);
        assert!(seed[0].motor_on);
        // step 7: 7 % 7 == 0, 7 % 3 == 1
        assert_eq!(seed[5].level, 700.0);
        assert!(!seed[5].motor_on);
    }

    #[test]
    fn seed_saturates_near_epoch() {
        let seed = synthesize_seed(0, 2_000.0);
        assert!(seed.iter().all(|sample| sample.timestamp == 0));
    }
}
