//! Motor on/off band segmentation for chart overlays.
//!
//! One linear pass groups consecutive samples with the same motor state into
//! a [`Band`]. A band ends at the timestamp of the sample that changed state,
//! which is also where the next band starts, so the bands tile the recorded
//! range `[first, last]` without gaps and agree with the step semantics of
//! [`motor_at`](super::motor_at).

use core::iter::FusedIterator;

use crate::sample::{Sample, TimestampMillis};

/// Maximal time interval with a constant motor state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Band {
    pub start: TimestampMillis,
    pub end: TimestampMillis,
    pub motor_on: bool,
}

impl Band {
    /// Creates a band.
    #[must_use]
    pub const fn new(start: TimestampMillis, end: TimestampMillis, motor_on: bool) -> Self {
        Self {
            start,
            end,
            motor_on,
        }
    }

    /// Length of the band in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` when `timestamp` lies strictly inside the band.
    #[must_use]
    pub const fn strictly_contains(&self, timestamp: TimestampMillis) -> bool {
        self.start < timestamp && timestamp < self.end
    }
}

/// Lazy band iterator returned by [`segment_bands`].
#[derive(Clone, Debug)]
pub struct Bands<'a> {
    samples: &'a [Sample],
    index: usize,
    run_start: TimestampMillis,
    run_state: bool,
    finished: bool,
}

/// Segments `samples` into same-motor-state bands.
///
/// Fewer than two samples produce no bands.
#[must_use]
pub fn segment_bands(samples: &[Sample]) -> Bands<'_> {
    match samples {
        [first, _, ..] => Bands {
            samples,
            index: 1,
            run_start: first.timestamp,
            run_state: first.motor_on,
            finished: false,
        },
        _ => Bands {
            samples,
            index: 0,
            run_start: 0,
            run_state: false,
            finished: true,
        },
    }
}

impl Iterator for Bands<'_> {
    type Item = Band;

    fn next(&mut self) -> Option<Band> {
        if self.finished {
            return None;
        }

        while let Some(sample) = self.samples.get(self.index) {
            self.index += 1;
            if sample.motor_on != self.run_state {
                let band = Band::new(self.run_start, sample.timestamp, self.run_state);
                self.run_start = sample.timestamp;
                self.run_state = sample.motor_on;
                return Some(band);
            }
        }

        self.finished = true;
        let end = self.samples.last()?.timestamp;
        Some(Band::new(self.run_start, end, self.run_state))
    }
}

impl FusedIterator for Bands<'_> {}
