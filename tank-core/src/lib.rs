#![no_std]

// Shared logic for the tank telemetry dashboard.
//
// This crate stays portable across hosts by avoiding the Rust standard library
// and allocator; every buffer is fixed-capacity. Renderers and event sources
// live in the host crates and talk to the widget through the seams defined here.

pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod host;
pub mod query;
pub mod sample;
pub mod telemetry;
pub mod view;
pub mod widget;

pub use config::{FlowRates, LevelThresholds, MirrorPolicy, WidgetConfig};
pub use error::{ConfigIssue, TankError, TankResult};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer, HistorySnapshot};
pub use host::{Clock, EventLoop, HostRuntime, ListenerKind, ManualClock};
pub use query::{Band, HoverReadout};
pub use sample::{Sample, TimestampMillis};
pub use telemetry::{DriveMode, ExternalInputs, Mode, TelemetryMachine, TelemetryState};
pub use view::{DashboardView, LayoutClass, TimeWindow};
pub use widget::{MountOptions, NoopToggleHandler, TankWidget, ToggleHandler};
