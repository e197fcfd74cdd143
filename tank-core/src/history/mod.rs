//! Bounded sample history and copy-on-read snapshots.
//!
//! The buffer is a fixed-capacity ring: appends are O(1) and overwrite the
//! oldest sample once the ring is full, so eviction is strictly FIFO and never
//! touches retained entries. Readers never borrow the ring directly; they take
//! a [`HistorySnapshot`], an ordered copy that later appends cannot disturb.

use heapless::{HistoryBuf, OldestOrdered, Vec};

use crate::error::TankResult;
use crate::query::{self, Band, Bands, HoverReadout};
use crate::sample::{Sample, TimestampMillis};

pub mod seed;

pub use seed::{SEED_SAMPLE_COUNT, SeedSamples, synthesize_seed};

/// Samples retained by default (30 minutes at one sample per second).
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_800;

/// Ring storage backing a [`HistoryBuffer`].
pub type SampleRing<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> =
    HistoryBuf<Sample, CAPACITY>;

/// Bounded, time-ordered sample history.
pub struct HistoryBuffer<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> {
    ring: SampleRing<CAPACITY>,
    revision: u64,
    evicted: u64,
}

impl<const CAPACITY: usize> HistoryBuffer<CAPACITY> {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            revision: 0,
            evicted: 0,
        }
    }

    /// Creates a history populated from an externally supplied, time-ordered
    /// sequence.
    ///
    /// When `samples` is longer than the capacity only the newest entries are
    /// kept. Out-of-order entries trip a debug assertion; release builds skip
    /// them.
    #[must_use]
    pub fn seeded<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut buffer = Self::new();
        let skipped = buffer.extend_ordered(samples);
        debug_assert!(skipped == 0, "seed history must be time-ordered");
        buffer
    }

    /// Writes `samples` without touching the revision counters, dropping
    /// every entry stamped before the newest one kept. Returns the number
    /// dropped.
    fn extend_ordered<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut skipped = 0;
        for sample in samples {
            if self
                .ring
                .recent()
                .is_some_and(|last| sample.timestamp < last.timestamp)
            {
                skipped += 1;
                continue;
            }
            self.ring.write(sample);
        }
        skipped
    }

    /// Appends a sample, returning the sample evicted to make room, if any.
    ///
    /// A sample stamped earlier than the newest entry is moved forward to that
    /// entry's timestamp so the history stays non-decreasing.
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        let sample = match self.ring.recent() {
            Some(last) if sample.timestamp < last.timestamp => Sample {
                timestamp: last.timestamp,
                ..sample
            },
            _ => sample,
        };

        let evicted = if self.ring.len() == CAPACITY {
            self.ring.oldest_ordered().next().copied()
        } else {
            None
        };

        self.ring.write(sample);
        self.revision = self.revision.wrapping_add(1);
        if evicted.is_some() {
            self.evicted = self.evicted.saturating_add(1);
        }

        evicted
    }

    /// Copies the history into an ordered, immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot<CAPACITY> {
        let mut samples = Vec::new();
        samples.extend(self.ring.oldest_ordered().copied());
        HistorySnapshot {
            samples,
            revision: self.revision,
        }
    }

    /// Returns an iterator over the retained samples, oldest first.
    pub fn oldest_first(&self) -> OldestOrdered<'_, Sample> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent sample, if any.
    pub fn latest(&self) -> Option<&Sample> {
        self.ring.recent()
    }

    /// Returns the number of retained samples.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Maximum number of retained samples.
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Counter bumped on every append; equal revisions mean equal contents.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Total number of samples evicted since construction.
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl<const CAPACITY: usize> Default for HistoryBuffer<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered copy of a [`HistoryBuffer`] taken for one render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct HistorySnapshot<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> {
    samples: Vec<Sample, CAPACITY>,
    revision: u64,
}

impl<const CAPACITY: usize> HistorySnapshot<CAPACITY> {
    /// Samples in chronological order.
    pub fn as_slice(&self) -> &[Sample] {
        self.samples.as_slice()
    }

    /// Revision of the buffer at the time the snapshot was taken.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Timestamp range covered by the snapshot.
    pub fn time_range(&self) -> Option<(TimestampMillis, TimestampMillis)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    /// Interpolated level at an arbitrary timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::NoData`](crate::TankError::NoData) for an empty
    /// snapshot.
    pub fn level_at(&self, timestamp: TimestampMillis) -> TankResult<f64> {
        query::level_at(self.as_slice(), timestamp)
    }

    /// Last-known motor state at an arbitrary timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::NoData`](crate::TankError::NoData) for an empty
    /// snapshot.
    pub fn motor_at(&self, timestamp: TimestampMillis) -> TankResult<bool> {
        query::motor_at(self.as_slice(), timestamp)
    }

    /// Combined tooltip readout at an arbitrary timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::NoData`](crate::TankError::NoData) for an empty
    /// snapshot.
    pub fn readout(&self, timestamp: TimestampMillis) -> TankResult<HoverReadout> {
        query::readout(self.as_slice(), timestamp)
    }

    /// Iterator over same-motor-state bands.
    pub fn bands(&self) -> Bands<'_> {
        query::segment_bands(self.as_slice())
    }

    /// Collects the bands into a fixed-capacity list.
    pub fn collect_bands(&self) -> Vec<Band, CAPACITY> {
        let mut bands = Vec::new();
        bands.extend(self.bands());
        bands
    }
}
