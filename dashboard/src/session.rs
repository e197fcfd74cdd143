//! Console session: the line-oriented owner of a widget.
//!
//! The session plays the external controller. It feeds readings in with
//! `set`, hands control back with `release`, answers toggle proposals and
//! drives a manual clock so runs are reproducible. Every line in and out can
//! be mirrored to a transcript stamped with console-clock offsets.

use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use tank_core::console::{self, Command, ConsoleError, catalog};
use tank_core::telemetry::{MirrorOutcome, TickOutcome, ToggleOutcome, Transition, UpdateOutcome};
use tank_core::{
    EventLoop, ExternalInputs, LayoutClass, ManualClock, MountOptions, Sample, TankError,
    TankWidget, TelemetryState, TimestampMillis, ToggleHandler,
};
use tracing::{debug, error, info, warn};

use crate::options::{HostError, Options};

/// Clock value the console starts from without `--start`.
pub const DEFAULT_START_MILLIS: TimestampMillis = 1_700_000_000_000;
/// Samples printed by a bare `history`.
pub const DEFAULT_HISTORY_LINES: u32 = 10;
/// Longest single `tick`.
pub const MAX_TICK_SECONDS: u32 = 86_400;

const TICK_STEP: Duration = Duration::from_secs(1);

pub type ConsoleHost = EventLoop<ManualClock>;

/// Collects toggle proposals raised while the widget is controlled.
#[derive(Clone, Debug, Default)]
pub struct ProposalSink(Rc<Cell<Option<bool>>>);

impl ProposalSink {
    fn take(&self) -> Option<bool> {
        self.0.take()
    }
}

impl ToggleHandler for ProposalSink {
    fn propose(&mut self, next_motor_on: bool) {
        self.0.set(Some(next_motor_on));
    }
}

pub struct Session {
    host: ConsoleHost,
    widget: TankWidget<ProposalSink>,
    inputs: ExternalInputs,
    proposals: ProposalSink,
    transcript: Option<TranscriptLogger>,
    started_at: TimestampMillis,
    finished: bool,
}

impl Session {
    /// Mounts a widget on a manual clock.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Widget`] when the widget rejects the
    /// configuration and [`HostError::Io`] when the transcript cannot be
    /// created.
    pub fn new(options: &Options, seed: &[Sample]) -> Result<Self, HostError> {
        let started_at = options.start.unwrap_or(DEFAULT_START_MILLIS);
        let mut host = EventLoop::new(ManualClock::starting_at(started_at));
        let proposals = ProposalSink::default();
        let mount = MountOptions {
            config: options.config,
            seed,
            ..MountOptions::default()
        };
        let widget = TankWidget::mount(mount, proposals.clone(), &mut host)?;
        let transcript = options
            .transcript
            .as_deref()
            .map(TranscriptLogger::create)
            .transpose()?;

        info!(
            start = started_at,
            capacity = options.config.capacity,
            seeded = !seed.is_empty(),
            "console session started"
        );
        Ok(Self {
            host,
            widget,
            inputs: ExternalInputs::none(),
            proposals,
            transcript,
            started_at,
            finished: false,
        })
    }

    /// Parses and runs one console line, returning the lines to print.
    ///
    /// # Errors
    ///
    /// Only transcript writes fail; command errors are reported as `ERR`
    /// lines.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            self.record(TranscriptRole::Host, trimmed)?;
        }

        let output = match console::parse(line) {
            Ok(command) => self.execute(command),
            Err(ConsoleError::Empty) => Vec::new(),
            Err(rejected) => {
                warn!(error = %rejected, line = trimmed, "rejected console line");
                vec![describe_rejection(&rejected)]
            }
        };

        for line in &output {
            self.record(TranscriptRole::Console, line)?;
        }
        Ok(output)
    }

    /// Returns `true` once `exit` or `quit` ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn now(&self) -> TimestampMillis {
        tank_core::HostRuntime::now(&self.host)
    }

    pub fn state(&self) -> TelemetryState {
        self.widget.state()
    }

    pub fn widget(&self) -> &TankWidget<ProposalSink> {
        &self.widget
    }

    pub fn host(&self) -> &ConsoleHost {
        &self.host
    }

    /// Releases the widget's registrations and flushes the transcript.
    ///
    /// # Errors
    ///
    /// Returns the transcript flush error, if any.
    pub fn close(self) -> io::Result<()> {
        let Self {
            mut host,
            widget,
            transcript,
            ..
        } = self;
        widget.teardown(&mut host);
        debug!(
            timers = host.active_timers(),
            listeners = host.active_listeners(),
            "widget torn down"
        );
        match transcript {
            Some(mut transcript) => transcript.flush(),
            None => Ok(()),
        }
    }

    fn record(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let offset = self.now().saturating_sub(self.started_at);
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(offset, role, line),
            None => Ok(()),
        }
    }

    fn execute(&mut self, command: Command<'_>) -> Vec<String> {
        match command {
            Command::Tick { seconds } => self.tick(seconds),
            Command::Toggle => self.toggle(),
            Command::Set { level, motor_on } => {
                self.inputs = ExternalInputs::controlled(level, motor_on);
                self.run_update()
            }
            Command::Release => {
                self.inputs = ExternalInputs::none();
                self.run_update()
            }
            Command::At(timestamp) => vec![self.readout(timestamp, &timestamp.to_string())],
            Command::Ago { seconds } => {
                let timestamp = self.now().saturating_sub(seconds.saturating_mul(1_000));
                vec![self.readout(timestamp, &format!("now-{seconds}s"))]
            }
            Command::Bands(Some(enabled)) => {
                self.widget.set_band_overlay(enabled);
                info!(enabled, "band overlay switched");
                vec![format!("band overlay {}", on_off(enabled))]
            }
            Command::Bands(None) => self.list_bands(),
            Command::History { count } => self.history(count.unwrap_or(DEFAULT_HISTORY_LINES)),
            Command::Status => self.status(),
            Command::Help { topic } => help(topic),
            Command::Exit => {
                self.finished = true;
                vec!["bye".to_string()]
            }
        }
    }

    fn tick(&mut self, seconds: u32) -> Vec<String> {
        if seconds > MAX_TICK_SECONDS {
            return vec![format!("ERR tick is limited to {MAX_TICK_SECONDS} seconds")];
        }

        let mut advanced = 0u32;
        for _ in 0..seconds {
            self.host.clock_mut().advance(TICK_STEP);
            while let Some(id) = self.host.poll_due() {
                if let Some(TickOutcome::Advanced(sample)) = self.widget.on_timer(id, &self.host) {
                    advanced += 1;
                    debug!(
                        timestamp = sample.timestamp,
                        level = sample.level,
                        motor_on = sample.motor_on,
                        "tick"
                    );
                }
            }
        }

        let mut lines = vec![format!(
            "+{seconds}s ticks={advanced} {}",
            describe_state(self.state())
        )];
        if advanced == 0 && self.widget.machine().is_controlled() && seconds > 0 {
            lines.push("simulation suspended while controlled".to_string());
        }
        lines
    }

    fn toggle(&mut self) -> Vec<String> {
        match self.widget.toggle_motor(&self.host) {
            ToggleOutcome::Toggled(sample) => {
                info!(motor_on = sample.motor_on, level = sample.level, "motor toggled");
                vec![format!(
                    "motor {} at {:.1} L",
                    on_off(sample.motor_on),
                    sample.level
                )]
            }
            ToggleOutcome::Proposed(_) => {
                let Some(next) = self.proposals.take() else {
                    return vec!["ERR toggle proposal was not delivered".to_string()];
                };
                info!(next_motor_on = next, "owner accepted toggle proposal");
                self.inputs.motor_on = Some(next);
                let mut lines = vec![format!("proposal motor {} accepted", on_off(next))];
                lines.extend(self.run_update());
                lines
            }
        }
    }

    fn run_update(&mut self) -> Vec<String> {
        match self.widget.update(self.inputs, &mut self.host) {
            Ok(outcome) => describe_update(outcome, self.state()),
            Err(failure) => {
                error!(error = %failure, "update cycle failed");
                vec![format!("ERR host {failure}")]
            }
        }
    }

    fn readout(&self, timestamp: TimestampMillis, label: &str) -> String {
        match self.widget.snapshot().readout(timestamp) {
            Ok(readout) => format!(
                "t={label} level={:.1} L motor={}",
                readout.level,
                on_off(readout.motor_on)
            ),
            Err(TankError::NoData) => "ERR no data recorded".to_string(),
            Err(other) => format!("ERR {other}"),
        }
    }

    fn list_bands(&self) -> Vec<String> {
        let snapshot = self.widget.snapshot();
        let mut lines: Vec<String> = snapshot
            .bands()
            .map(|band| {
                format!(
                    "{}..{} motor={} ({}s)",
                    band.start,
                    band.end,
                    on_off(band.motor_on),
                    band.end.saturating_sub(band.start) / 1_000
                )
            })
            .collect();
        lines.insert(0, format!("{} bands", lines.len()));
        lines
    }

    fn history(&self, count: u32) -> Vec<String> {
        let snapshot = self.widget.snapshot();
        let samples = snapshot.as_slice();
        let count = usize::try_from(count).unwrap_or(usize::MAX).min(samples.len());
        samples[samples.len() - count..]
            .iter()
            .map(|sample| {
                format!(
                    "t={} level={:.1} L motor={}",
                    sample.timestamp,
                    sample.level,
                    on_off(sample.motor_on)
                )
            })
            .collect()
    }

    fn status(&mut self) -> Vec<String> {
        let overlay = self.widget.band_overlay();
        let view = self.widget.view();
        let mut badges = Vec::new();
        if view.low_level {
            badges.push("LOW LEVEL");
        }
        if view.near_full {
            badges.push("NEAR FULL");
        }
        let layout = match view.layout {
            LayoutClass::Narrow => "narrow",
            LayoutClass::Wide => "wide",
        };

        vec![
            format!(
                "level {} of {} ({:.1}%)",
                view.liters_text, view.capacity_text, view.percent
            ),
            format!(
                "motor {} mode {} layout {layout}",
                on_off(view.motor_on),
                view.mode
            ),
            format!(
                "badges {}",
                if badges.is_empty() {
                    "none".to_string()
                } else {
                    badges.join(", ")
                }
            ),
            format!(
                "samples {} overlay {}",
                view.snapshot.len(),
                on_off(overlay)
            ),
        ]
    }
}

fn help(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => {
            let mut lines = vec!["commands:".to_string()];
            lines.extend(
                catalog::commands()
                    .iter()
                    .map(|spec| format!("  {:<24}{}", spec.usage, spec.summary)),
            );
            lines
        }
        Some(name) => match catalog::find(name) {
            Some(spec) => vec![format!("usage: {}", spec.usage), spec.summary.to_string()],
            None => vec![format!("ERR unknown help topic `{name}`")],
        },
    }
}

fn describe_rejection(rejected: &ConsoleError<'_>) -> String {
    match rejected {
        ConsoleError::UnknownCommand(word) => {
            format!("ERR unknown command `{word}` (try `help`)")
        }
        other => format!("ERR syntax {other}"),
    }
}

fn describe_update(outcome: UpdateOutcome, state: TelemetryState) -> Vec<String> {
    let mut lines = Vec::new();
    match outcome.transition {
        Some(Transition::EnteredControlled) => {
            info!(level = state.level, "entered controlled mode");
            lines.push("mode controlled; simulation suspended".to_string());
        }
        Some(Transition::Released) => {
            info!(level = state.level, "control released");
            lines.push(format!(
                "mode uncontrolled; simulation resumed at {:.1} L",
                state.level
            ));
        }
        None => {}
    }
    match outcome.mirror {
        MirrorOutcome::Appended(sample) => {
            debug!(level = sample.level, motor_on = sample.motor_on, "mirrored reading");
            lines.push(format!(
                "recorded level={:.1} L motor={}",
                sample.level,
                on_off(sample.motor_on)
            ));
        }
        MirrorOutcome::Unchanged => lines.push("reading unchanged; nothing recorded".to_string()),
        MirrorOutcome::NotControlled => {}
    }
    if lines.is_empty() {
        lines.push(describe_state(state));
    }
    lines
}

fn describe_state(state: TelemetryState) -> String {
    format!(
        "level={:.1} L motor={} mode={}",
        state.level,
        on_off(state.motor_on),
        state.mode
    )
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# tank-console transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are console-clock milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, offset_ms: u64, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{offset_ms:>6} ms] {} {line}",
            role.prefix()
        )?;
        self.writer.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[derive(Copy, Clone)]
enum TranscriptRole {
    Host,
    Console,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Console => "TANK<",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_render_as_err_lines() {
        assert_eq!(
            describe_rejection(&ConsoleError::UnknownCommand("reboot")),
            "ERR unknown command `reboot` (try `help`)"
        );
        assert_eq!(
            describe_rejection(&ConsoleError::Syntax {
                usage: "set <level> <on|off>",
                column: 3,
            }),
            "ERR syntax usage: set <level> <on|off> (at column 3)"
        );
    }

    #[test]
    fn help_lists_every_command() {
        let lines = help(None);
        assert_eq!(lines.len(), catalog::commands().len() + 1);
        assert_eq!(help(Some("SET"))[0], "usage: set <level> <on|off>");
        assert_eq!(help(Some("nope")), vec!["ERR unknown help topic `nope`"]);
    }

    #[test]
    fn proposals_are_taken_once() {
        let mut sink = ProposalSink::default();
        let reader = sink.clone();
        sink.propose(true);
        assert_eq!(reader.take(), Some(true));
        assert_eq!(reader.take(), None);
    }
}
