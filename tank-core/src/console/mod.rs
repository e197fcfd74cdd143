//! Line-oriented console used by hosts that drive the widget as its owner.
//!
//! The grammar lives in [`grammar`]; [`catalog`] holds the command table that
//! both the parser and the `help` output read.

use thiserror::Error;

use crate::sample::TimestampMillis;

pub mod catalog;
pub mod grammar;

pub use catalog::{CommandSpec, CommandTag};
pub use grammar::parse;

/// Parsed console command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command<'a> {
    /// Advance the clock by whole seconds.
    Tick { seconds: u32 },
    Toggle,
    /// Supply both external readings.
    Set { level: f64, motor_on: bool },
    /// Stop supplying external readings.
    Release,
    /// Readout at an absolute timestamp.
    At(TimestampMillis),
    /// Readout relative to the current time.
    Ago { seconds: u64 },
    /// `None` lists bands, `Some` switches the overlay.
    Bands(Option<bool>),
    History { count: Option<u32> },
    Status,
    Help { topic: Option<&'a str> },
    Exit,
}

/// Rejected console line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsoleError<'a> {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(&'a str),
    #[error("usage: {usage} (at column {column})")]
    Syntax { usage: &'static str, column: usize },
}
