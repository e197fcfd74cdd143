//! Visible time range of the history chart.
//!
//! The window follows the newest sample by default. Zooming or panning away
//! from the live edge detaches it; panning back to the edge or calling
//! [`TimeWindow::follow_live`] reattaches it. Every operation clamps the
//! window into the recorded range.

use crate::sample::TimestampMillis;

/// Narrowest span the window zooms into.
pub const MIN_WINDOW_SPAN_MS: u64 = 10_000;

/// Visible `[start, end]` range over the time axis.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeWindow {
    start: TimestampMillis,
    end: TimestampMillis,
    following: bool,
}

impl TimeWindow {
    /// Window spanning the whole recorded range, following live data.
    #[must_use]
    pub const fn covering(bounds: (TimestampMillis, TimestampMillis)) -> Self {
        Self {
            start: bounds.0,
            end: bounds.1,
            following: true,
        }
    }

    pub const fn start(&self) -> TimestampMillis {
        self.start
    }

    pub const fn end(&self) -> TimestampMillis {
        self.end
    }

    pub const fn span(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` while the window tracks the newest sample.
    pub const fn is_following(&self) -> bool {
        self.following
    }

    /// Returns `true` when `timestamp` is visible.
    pub const fn contains(&self, timestamp: TimestampMillis) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Re-anchors the window after the recorded range changed.
    ///
    /// A following window slides so its end stays on the newest sample while
    /// keeping its span.
    pub fn sync(&mut self, bounds: (TimestampMillis, TimestampMillis)) {
        if self.following {
            let span = self.span();
            self.end = bounds.1;
            self.start = bounds.1.saturating_sub(span);
        }
        self.clamp(bounds);
    }

    /// Scales the span by `factor` around `anchor`.
    ///
    /// Factors below one zoom in. The anchor keeps its relative position in
    /// the window, so zooming around the cursor keeps the cursor still.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn zoom(
        &mut self,
        factor: f64,
        anchor: TimestampMillis,
        bounds: (TimestampMillis, TimestampMillis),
    ) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let span = self.span();
        let scaled = (span as f64 * factor) as u64;
        let new_span = scaled.max(MIN_WINDOW_SPAN_MS);

        let anchor = anchor.clamp(self.start, self.end);
        let ratio = if span == 0 {
            1.0
        } else {
            (anchor - self.start) as f64 / span as f64
        };
        let lead = (new_span as f64 * ratio) as u64;

        self.start = anchor.saturating_sub(lead);
        self.end = self.start.saturating_add(new_span);
        self.clamp(bounds);
        self.following = self.end >= bounds.1 && factor >= 1.0 && self.following;
    }

    /// Shifts the window by `delta_ms`; negative values move into the past.
    pub fn pan(&mut self, delta_ms: i64, bounds: (TimestampMillis, TimestampMillis)) {
        let span = self.span();
        self.start = self.start.saturating_add_signed(delta_ms);
        self.end = self.start.saturating_add(span);
        self.clamp(bounds);
        self.following = self.end >= bounds.1;
    }

    /// Jumps back to the live edge.
    pub fn follow_live(&mut self, bounds: (TimestampMillis, TimestampMillis)) {
        self.following = true;
        self.sync(bounds);
    }

    /// Position of `timestamp` inside the window as a fraction in `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_of(&self, timestamp: TimestampMillis) -> f64 {
        let span = self.span();
        if span == 0 {
            return 1.0;
        }
        let offset = timestamp.clamp(self.start, self.end) - self.start;
        offset as f64 / span as f64
    }

    /// Timestamp at a fractional position inside the window.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn timestamp_at(&self, fraction: f64) -> TimestampMillis {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.start + (self.span() as f64 * fraction) as u64
    }

    fn clamp(&mut self, (low, high): (TimestampMillis, TimestampMillis)) {
        let full = high.saturating_sub(low);
        let span = self.span().min(full).max(MIN_WINDOW_SPAN_MS.min(full));
        self.start = self.start.clamp(low, high - span);
        self.end = self.start + span;
    }
}
