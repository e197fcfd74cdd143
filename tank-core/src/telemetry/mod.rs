//! Dual-mode telemetry state machine.
//!
//! Each update cycle decides who owns the current reading. When the host
//! supplies both a level and a motor flag the machine is `Controlled` and
//! copies those readings into the history; otherwise it runs its own
//! `Uncontrolled` fill/drain simulation, advanced one second per tick. The
//! simulation state survives a controlled stretch untouched and resumes from
//! where it stopped once control is released.
//!
//! The machine never logs and never calls back into the host. Every operation
//! returns an outcome value so the caller decides what to log, which timer to
//! cancel and whether to forward a toggle proposal.

use core::fmt;

use crate::config::{MirrorPolicy, WidgetConfig};
use crate::error::TankResult;
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer, HistorySnapshot};
use crate::sample::{Sample, TimestampMillis, clamp_level};

/// Readings supplied by the controlling owner for one update cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ExternalInputs {
    pub level: Option<f64>,
    pub motor_on: Option<bool>,
}

impl ExternalInputs {
    /// No external readings; the widget simulates.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            level: None,
            motor_on: None,
        }
    }

    /// Both readings present; the widget mirrors them.
    #[must_use]
    pub const fn controlled(level: f64, motor_on: bool) -> Self {
        Self {
            level: Some(level),
            motor_on: Some(motor_on),
        }
    }

    /// Returns the complete reading when both values are present.
    #[must_use]
    pub fn reading(&self) -> Option<ExternalReading> {
        Some(ExternalReading {
            level: self.level?,
            motor_on: self.motor_on?,
        })
    }
}

/// A complete external reading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExternalReading {
    pub level: f64,
    pub motor_on: bool,
}

impl ExternalReading {
    fn clamped(self, capacity: f64) -> Self {
        Self {
            level: clamp_level(self.level, capacity),
            ..self
        }
    }
}

/// Internal fill/drain simulation state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Simulation {
    level: f64,
    motor_on: bool,
}

impl Simulation {
    /// Current simulated level in liters.
    #[must_use]
    pub const fn level(&self) -> f64 {
        self.level
    }

    /// Current simulated motor state.
    #[must_use]
    pub const fn motor_on(&self) -> bool {
        self.motor_on
    }

    fn step(&mut self, config: &WidgetConfig) {
        let next = self.level + config.flow.per_second_delta(self.motor_on);
        self.level = clamp_level(next, config.capacity);
    }
}

/// Which side owns the current reading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DriveMode {
    /// External readings are authoritative; the simulation is parked.
    Controlled {
        reading: ExternalReading,
        suspended: Simulation,
    },
    /// The simulation is authoritative.
    Uncontrolled(Simulation),
}

impl DriveMode {
    /// Discriminant without the payload.
    #[must_use]
    pub const fn kind(&self) -> Mode {
        match self {
            DriveMode::Controlled { .. } => Mode::Controlled,
            DriveMode::Uncontrolled(_) => Mode::Uncontrolled,
        }
    }
}

/// Payload-free form of [`DriveMode`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    Controlled,
    Uncontrolled,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Controlled => f.write_str("controlled"),
            Mode::Uncontrolled => f.write_str("uncontrolled"),
        }
    }
}

/// Current reading as seen by renderers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryState {
    pub level: f64,
    pub motor_on: bool,
    pub mode: Mode,
}

/// Result of a simulation tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The simulation advanced and recorded this sample.
    Advanced(Sample),
    /// Ticks are suspended while controlled.
    Suspended,
}

/// Result of a motor toggle request.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ToggleOutcome {
    /// The simulated motor flipped and this sample was recorded.
    Toggled(Sample),
    /// Controlled: the owner should be asked to switch the motor to this state.
    Proposed(bool),
}

/// Result of mirroring an external reading.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MirrorOutcome {
    Appended(Sample),
    /// The reading matched the last mirrored one and the policy skips repeats.
    Unchanged,
    /// Mirroring only happens while controlled.
    NotControlled,
}

/// Authority change caused by an update cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    EnteredControlled,
    Released,
}

/// Result of one update cycle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UpdateOutcome {
    pub transition: Option<Transition>,
    pub mirror: MirrorOutcome,
}

/// Telemetry state plus the history it feeds.
pub struct TelemetryMachine<const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY> {
    config: WidgetConfig,
    mode: DriveMode,
    history: HistoryBuffer<CAPACITY>,
    last_mirrored: Option<ExternalReading>,
}

impl<const CAPACITY: usize> TelemetryMachine<CAPACITY> {
    /// Builds a machine over an already seeded history.
    ///
    /// Missing inputs fall back to the default start level and a stopped
    /// motor. When both inputs are present the machine starts controlled; the
    /// first [`update`](Self::update) then mirrors the reading.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::InvalidConfiguration`](crate::TankError::InvalidConfiguration)
    /// when `config` fails validation.
    pub fn new(
        config: WidgetConfig,
        inputs: ExternalInputs,
        history: HistoryBuffer<CAPACITY>,
    ) -> TankResult<Self> {
        config.validate()?;

        let simulation = Simulation {
            level: clamp_level(
                inputs.level.unwrap_or_else(|| config.default_start_level()),
                config.capacity,
            ),
            motor_on: inputs.motor_on.unwrap_or(false),
        };
        let mode = match inputs.reading() {
            Some(reading) => DriveMode::Controlled {
                reading: reading.clamped(config.capacity),
                suspended: simulation,
            },
            None => DriveMode::Uncontrolled(simulation),
        };

        Ok(Self {
            config,
            mode,
            history,
            last_mirrored: None,
        })
    }

    /// Reconciles one update cycle's inputs with the current mode.
    ///
    /// Entering or staying controlled mirrors the reading into the history.
    pub fn update(&mut self, inputs: ExternalInputs, now: TimestampMillis) -> UpdateOutcome {
        let capacity = self.config.capacity;
        let transition = match (inputs.reading(), self.mode) {
            (Some(reading), DriveMode::Uncontrolled(simulation)) => {
                self.mode = DriveMode::Controlled {
                    reading: reading.clamped(capacity),
                    suspended: simulation,
                };
                self.last_mirrored = None;
                Some(Transition::EnteredControlled)
            }
            (None, DriveMode::Controlled { suspended, .. }) => {
                self.mode = DriveMode::Uncontrolled(suspended);
                Some(Transition::Released)
            }
            _ => None,
        };

        let mirror = match inputs.reading() {
            Some(reading) => self.mirror_external(reading.level, reading.motor_on, now),
            None => MirrorOutcome::NotControlled,
        };

        UpdateOutcome { transition, mirror }
    }

    /// Advances the simulation by one second and records the result.
    pub fn tick(&mut self, now: TimestampMillis) -> TickOutcome {
        let DriveMode::Uncontrolled(simulation) = &mut self.mode else {
            return TickOutcome::Suspended;
        };
        simulation.step(&self.config);
        let sample = Sample::new(now, simulation.level, simulation.motor_on);
        self.history.append(sample);
        TickOutcome::Advanced(sample)
    }

    /// Flips the simulated motor, or proposes a flip to the controlling owner.
    ///
    /// The recorded sample keeps the level from before the toggle and carries
    /// the new motor state.
    pub fn toggle_motor(&mut self, now: TimestampMillis) -> ToggleOutcome {
        match &mut self.mode {
            DriveMode::Controlled { reading, .. } => ToggleOutcome::Proposed(!reading.motor_on),
            DriveMode::Uncontrolled(simulation) => {
                simulation.motor_on = !simulation.motor_on;
                let sample = Sample::new(now, simulation.level, simulation.motor_on);
                self.history.append(sample);
                ToggleOutcome::Toggled(sample)
            }
        }
    }

    /// Copies an external reading into the history while controlled.
    pub fn mirror_external(
        &mut self,
        level: f64,
        motor_on: bool,
        now: TimestampMillis,
    ) -> MirrorOutcome {
        let DriveMode::Controlled { reading, .. } = &mut self.mode else {
            return MirrorOutcome::NotControlled;
        };

        let incoming = ExternalReading { level, motor_on }.clamped(self.config.capacity);
        *reading = incoming;

        let repeat = self.last_mirrored == Some(incoming);
        if repeat && self.config.mirror_policy == MirrorPolicy::OnChange {
            return MirrorOutcome::Unchanged;
        }

        self.last_mirrored = Some(incoming);
        let sample = Sample::new(now, incoming.level, incoming.motor_on);
        self.history.append(sample);
        MirrorOutcome::Appended(sample)
    }

    /// Current level, motor flag and mode.
    #[must_use]
    pub fn state(&self) -> TelemetryState {
        let (level, motor_on) = match &self.mode {
            DriveMode::Controlled { reading, .. } => (reading.level, reading.motor_on),
            DriveMode::Uncontrolled(simulation) => (simulation.level, simulation.motor_on),
        };
        TelemetryState {
            level,
            motor_on,
            mode: self.mode.kind(),
        }
    }

    pub fn is_controlled(&self) -> bool {
        self.mode.kind() == Mode::Controlled
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryBuffer<CAPACITY> {
        &self.history
    }

    /// Copy-on-read view of the history.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot<CAPACITY> {
        self.history.snapshot()
    }
}
