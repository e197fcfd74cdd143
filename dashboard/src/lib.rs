//! Terminal hosts for the tank telemetry widget.
//!
//! `tank-dashboard` renders the widget full-screen with ratatui on the wall
//! clock. `tank-console` drives it line by line on a manual clock and plays
//! the external owner that supplies readings.

pub mod app;
pub mod clock;
pub mod logging;
pub mod options;
pub mod render;
pub mod session;
