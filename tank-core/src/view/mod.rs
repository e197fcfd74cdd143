//! Read model handed to renderers.
//!
//! [`DashboardView`] bundles everything one render pass needs: the current
//! reading with its derived percentages and badges, a stable history
//! snapshot, and the band list when the overlay is on. [`ViewCache`] rebuilds
//! it only when one of its inputs changed.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::config::{LevelThresholds, WidgetConfig};
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistorySnapshot};
use crate::query::Band;
use crate::sample::round_liters;
use crate::telemetry::{Mode, TelemetryState};

pub mod window;

pub use window::{MIN_WINDOW_SPAN_MS, TimeWindow};

/// Formatted volume such as `1,234 L`.
pub type LitersText = String<32>;

/// Formats a level as whole liters with thousands separators.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_liters(level: f64) -> LitersText {
    let mut text = LitersText::new();
    let liters = round_liters(level) as u64;
    // 20 digits plus separators and the suffix fit in 32 bytes.
    let _ = write_grouped(&mut text, liters).and_then(|()| text.write_str(" L"));
    text
}

fn write_grouped(out: &mut impl Write, value: u64) -> fmt::Result {
    if value < 1_000 {
        return write!(out, "{value}");
    }
    write_grouped(out, value / 1_000)?;
    write!(out, ",{:03}", value % 1_000)
}

/// Panel arrangement derived from the host viewport width.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LayoutClass {
    /// Panels stacked in a single column.
    Narrow,
    /// Diagram and details side by side above the chart.
    Wide,
}

impl LayoutClass {
    /// Classifies a viewport width against the configured breakpoint.
    #[must_use]
    pub const fn classify(width: u16, breakpoint: u16) -> Self {
        if width < breakpoint {
            LayoutClass::Narrow
        } else {
            LayoutClass::Wide
        }
    }
}

/// The only inputs the tank diagram renderer consumes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiagramModel {
    /// Fill level in `[0, 1]`.
    pub level_fraction: f64,
    pub motor_on: bool,
}

/// Per-render read model.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> {
    pub level: f64,
    pub capacity: f64,
    /// Fill fraction in `[0, 1]`.
    pub fraction: f64,
    /// Fill percentage in `[0, 100]`.
    pub percent: f64,
    pub liters_text: LitersText,
    pub capacity_text: LitersText,
    pub low_level: bool,
    pub near_full: bool,
    pub thresholds: LevelThresholds,
    /// Low threshold in liters.
    pub low_level_liters: f64,
    /// High threshold in liters.
    pub high_level_liters: f64,
    pub show_thresholds: bool,
    pub motor_on: bool,
    pub mode: Mode,
    pub layout: LayoutClass,
    pub snapshot: HistorySnapshot<CAPACITY>,
    /// Motor bands; `None` while the overlay is disabled.
    pub bands: Option<Vec<Band, CAPACITY>>,
    pub diagram: DiagramModel,
}

impl<const CAPACITY: usize> DashboardView<CAPACITY> {
    /// Derives the read model from the current state and a history snapshot.
    #[must_use]
    pub fn build(
        state: TelemetryState,
        config: &WidgetConfig,
        layout: LayoutClass,
        snapshot: HistorySnapshot<CAPACITY>,
    ) -> Self {
        let capacity = config.capacity;
        let fraction = (state.level / capacity).clamp(0.0, 1.0);
        let percent = fraction * 100.0;
        let (low_level_liters, high_level_liters) = config.thresholds.absolute(capacity);
        let bands = config
            .show_band_overlay
            .then(|| snapshot.collect_bands());

        Self {
            level: state.level,
            capacity,
            fraction,
            percent,
            liters_text: format_liters(state.level),
            capacity_text: format_liters(capacity),
            low_level: config.thresholds.is_low(percent),
            near_full: config.thresholds.is_high(percent),
            thresholds: config.thresholds,
            low_level_liters,
            high_level_liters,
            show_thresholds: config.show_thresholds,
            motor_on: state.motor_on,
            mode: state.mode,
            layout,
            snapshot,
            bands,
            diagram: DiagramModel {
                level_fraction: fraction,
                motor_on: state.motor_on,
            },
        }
    }
}

/// Inputs that invalidate a cached [`DashboardView`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewKey {
    pub revision: u64,
    pub capacity: f64,
    pub thresholds: LevelThresholds,
    pub show_band_overlay: bool,
    pub show_thresholds: bool,
    pub state: TelemetryState,
    pub layout: LayoutClass,
}

impl ViewKey {
    #[must_use]
    pub fn new(
        revision: u64,
        config: &WidgetConfig,
        state: TelemetryState,
        layout: LayoutClass,
    ) -> Self {
        Self {
            revision,
            capacity: config.capacity,
            thresholds: config.thresholds,
            show_band_overlay: config.show_band_overlay,
            show_thresholds: config.show_thresholds,
            state,
            layout,
        }
    }
}

/// Memoizes the most recent [`DashboardView`].
pub struct ViewCache<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> {
    entry: Option<(ViewKey, DashboardView<CAPACITY>)>,
    rebuilds: u64,
}

impl<const CAPACITY: usize> ViewCache<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entry: None,
            rebuilds: 0,
        }
    }

    /// Returns the cached view for `key`, building it first when stale.
    pub fn get_or_build(
        &mut self,
        key: ViewKey,
        build: impl FnOnce() -> DashboardView<CAPACITY>,
    ) -> &DashboardView<CAPACITY> {
        let fresh = matches!(&self.entry, Some((cached, _)) if *cached == key);
        if !fresh {
            self.entry = None;
            self.rebuilds = self.rebuilds.wrapping_add(1);
        }
        &self.entry.get_or_insert_with(|| (key, build())).1
    }

    /// Drops the cached view.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of times a view was built.
    pub const fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

impl<const CAPACITY: usize> Default for ViewCache<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
