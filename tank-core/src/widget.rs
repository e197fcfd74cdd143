//! The mounted dashboard widget.
//!
//! A [`TankWidget`] owns one telemetry machine and every host registration it
//! made: the one-second tick interval and its keyboard and resize listeners.
//! Hosts forward timer firings, key presses and viewport changes to it and
//! read a [`DashboardView`] back for rendering. [`TankWidget::teardown`]
//! consumes the widget and hands every registration back to the host.

use core::time::Duration;

use crate::config::WidgetConfig;
use crate::error::TankResult;
use crate::history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer, HistorySnapshot, synthesize_seed};
use crate::host::{HostRuntime, ListenerId, ListenerKind, TimerId};
use crate::sample::Sample;
use crate::telemetry::{
    ExternalInputs, TelemetryMachine, TelemetryState, TickOutcome, ToggleOutcome,
    UpdateOutcome,
};
use crate::view::{DashboardView, LayoutClass, ViewCache, ViewKey};

/// Period of the simulation tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Receives motor toggle proposals while the widget is controlled.
pub trait ToggleHandler {
    /// Called with the motor state the owner is asked to switch to.
    fn propose(&mut self, next_motor_on: bool);
}

/// Handler that ignores every proposal.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopToggleHandler;

impl ToggleHandler for NoopToggleHandler {
    fn propose(&mut self, _: bool) {}
}

impl<F> ToggleHandler for F
where
    F: FnMut(bool),
{
    fn propose(&mut self, next_motor_on: bool) {
        self(next_motor_on);
    }
}

/// Construction inputs for [`TankWidget::mount`].
#[derive(Copy, Clone, Debug)]
pub struct MountOptions<'a> {
    pub config: WidgetConfig,
    pub inputs: ExternalInputs,
    /// Initial history; an empty slice selects the synthesized seed.
    pub seed: &'a [Sample],
    /// Host viewport width used for the initial layout class.
    pub viewport_width: u16,
}

impl Default for MountOptions<'_> {
    fn default() -> Self {
        Self {
            config: WidgetConfig::default(),
            inputs: ExternalInputs::none(),
            seed: &[],
            viewport_width: u16::MAX,
        }
    }
}

/// Telemetry machine bound to a host runtime.
pub struct TankWidget<T = NoopToggleHandler, const CAPACITY: usize = DEFAULT_HISTORY_CAPACITY>
where
    T: ToggleHandler,
{
    machine: TelemetryMachine<CAPACITY>,
    on_toggle: T,
    show_band_overlay: bool,
    layout: LayoutClass,
    timer: Option<TimerId>,
    keyboard: Option<ListenerId>,
    resize: Option<ListenerId>,
    cache: ViewCache<CAPACITY>,
}

impl<T, const CAPACITY: usize> TankWidget<T, CAPACITY>
where
    T: ToggleHandler,
{
    /// Validates the configuration, seeds the history and registers with the
    /// host.
    ///
    /// The tick interval is only started when the widget begins uncontrolled.
    /// When both external inputs are present the first reading is mirrored
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::InvalidConfiguration`](crate::TankError::InvalidConfiguration)
    /// for a rejected configuration, or
    /// [`TankError::HostCapacityExhausted`](crate::TankError::HostCapacityExhausted)
    /// when the host cannot take another registration. Nothing stays
    /// registered on failure.
    pub fn mount<H>(options: MountOptions<'_>, on_toggle: T, host: &mut H) -> TankResult<Self>
    where
        H: HostRuntime,
    {
        let MountOptions {
            config,
            inputs,
            seed,
            viewport_width,
        } = options;
        config.validate()?;

        let now = host.now();
        let capacity = config.capacity;
        let history = if seed.is_empty() {
            HistoryBuffer::seeded(synthesize_seed(now, capacity))
        } else {
            HistoryBuffer::seeded(seed.iter().map(|sample| sample.clamped(capacity)))
        };
        let machine = TelemetryMachine::new(config, inputs, history)?;

        let mut widget = Self {
            machine,
            on_toggle,
            show_band_overlay: config.show_band_overlay,
            layout: LayoutClass::classify(viewport_width, config.narrow_breakpoint),
            timer: None,
            keyboard: None,
            resize: None,
            cache: ViewCache::new(),
        };

        if let Err(error) = widget.register(host) {
            widget.release(host);
            return Err(error);
        }

        widget.machine.update(inputs, now);
        Ok(widget)
    }

    fn register<H: HostRuntime>(&mut self, host: &mut H) -> TankResult<()> {
        self.keyboard = Some(host.add_listener(ListenerKind::Keyboard)?);
        self.resize = Some(host.add_listener(ListenerKind::Resize)?);
        if !self.machine.is_controlled() {
            self.timer = Some(host.start_interval(TICK_PERIOD)?);
        }
        Ok(())
    }

    fn release<H: HostRuntime>(&mut self, host: &mut H) {
        if let Some(id) = self.timer.take() {
            host.cancel_interval(id);
        }
        if let Some(id) = self.keyboard.take() {
            host.remove_listener(id);
        }
        if let Some(id) = self.resize.take() {
            host.remove_listener(id);
        }
    }

    /// Runs one update cycle with the owner's current inputs.
    ///
    /// Entering control cancels the tick interval. Any cycle that finds the
    /// widget uncontrolled without an interval starts a fresh one, so a failed
    /// re-arm is retried on the next update.
    ///
    /// # Errors
    ///
    /// Returns [`TankError::HostCapacityExhausted`](crate::TankError::HostCapacityExhausted)
    /// when the interval cannot be started. The mode change itself has
    /// already happened.
    pub fn update<H>(&mut self, inputs: ExternalInputs, host: &mut H) -> TankResult<UpdateOutcome>
    where
        H: HostRuntime,
    {
        let outcome = self.machine.update(inputs, host.now());
        if self.machine.is_controlled() {
            if let Some(id) = self.timer.take() {
                host.cancel_interval(id);
            }
        } else if self.timer.is_none() {
            self.timer = Some(host.start_interval(TICK_PERIOD)?);
        }
        Ok(outcome)
    }

    /// Dispatches a timer firing. Returns `None` for timers this widget does
    /// not own.
    pub fn on_timer<H>(&mut self, id: TimerId, host: &H) -> Option<TickOutcome>
    where
        H: HostRuntime,
    {
        (self.timer == Some(id)).then(|| self.machine.tick(host.now()))
    }

    /// Dispatches a key press; `m` in either case toggles the motor.
    pub fn on_key<H>(&mut self, key: char, host: &H) -> Option<ToggleOutcome>
    where
        H: HostRuntime,
    {
        if self.keyboard.is_none() || !key.eq_ignore_ascii_case(&'m') {
            return None;
        }
        Some(self.toggle_motor(host))
    }

    /// Toggles the motor, forwarding the proposal to the owner while
    /// controlled.
    pub fn toggle_motor<H>(&mut self, host: &H) -> ToggleOutcome
    where
        H: HostRuntime,
    {
        let outcome = self.machine.toggle_motor(host.now());
        if let ToggleOutcome::Proposed(next) = outcome {
            self.on_toggle.propose(next);
        }
        outcome
    }

    /// Reclassifies the layout for a new viewport width.
    pub fn on_resize(&mut self, width: u16) -> LayoutClass {
        if self.resize.is_some() {
            self.layout = LayoutClass::classify(width, self.machine.config().narrow_breakpoint);
        }
        self.layout
    }

    /// Enables or disables the motor band overlay.
    pub fn set_band_overlay(&mut self, enabled: bool) {
        self.show_band_overlay = enabled;
    }

    pub fn band_overlay(&self) -> bool {
        self.show_band_overlay
    }

    /// Read model for the current render pass.
    pub fn view(&mut self) -> &DashboardView<CAPACITY> {
        let config = WidgetConfig {
            show_band_overlay: self.show_band_overlay,
            ..*self.machine.config()
        };
        let state = self.machine.state();
        let layout = self.layout;
        let key = ViewKey::new(self.machine.history().revision(), &config, state, layout);
        let machine = &self.machine;
        self.cache.get_or_build(key, || {
            DashboardView::build(state, &config, layout, machine.snapshot())
        })
    }

    pub fn state(&self) -> TelemetryState {
        self.machine.state()
    }

    pub fn config(&self) -> &WidgetConfig {
        self.machine.config()
    }

    pub fn machine(&self) -> &TelemetryMachine<CAPACITY> {
        &self.machine
    }

    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot<CAPACITY> {
        self.machine.snapshot()
    }

    pub fn layout(&self) -> LayoutClass {
        self.layout
    }

    /// Returns `true` while the tick interval is registered.
    pub fn is_ticking(&self) -> bool {
        self.timer.is_some()
    }

    /// Number of view rebuilds so far.
    pub fn view_rebuilds(&self) -> u64 {
        self.cache.rebuilds()
    }

    /// Releases every host registration and drops the widget.
    pub fn teardown<H>(mut self, host: &mut H)
    where
        H: HostRuntime,
    {
        self.release(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TankError;
    use crate::host::{EventLoop, ManualClock};
    use crate::telemetry::Mode;

    type Host = EventLoop<ManualClock>;
    type Widget = TankWidget<NoopToggleHandler, 64>;

    const START: u64 = 10_000_000;

    fn host() -> Host {
        EventLoop::new(ManualClock::starting_at(START))
    }

    fn tick_seconds<T: ToggleHandler>(widget: &mut TankWidget<T, 64>, host: &mut Host, seconds: u64) {
        for _ in 0..seconds {
            host.clock_mut().advance(Duration::from_secs(1));
            while let Some(id) = host.poll_due() {
                widget.on_timer(id, &*host);
            }
        }
    }

    #[test]
    fn mount_registers_timer_and_listeners() {
        let mut host = host();
        let widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();

        assert!(widget.is_ticking());
        assert_eq!(host.active_timers(), 1);
        assert!(host.has_listener(ListenerKind::Keyboard));
        assert!(host.has_listener(ListenerKind::Resize));
        assert_eq!(widget.snapshot().len(), 13);
    }

    #[test]
    fn invalid_configuration_registers_nothing() {
        let mut host = host();
        let options = MountOptions {
            config: WidgetConfig::with_capacity(-1.0),
            ..MountOptions::default()
        };
        let result = Widget::mount(options, NoopToggleHandler, &mut host);
        assert!(matches!(result, Err(TankError::InvalidConfiguration(_))));
        assert_eq!(host.active_timers(), 0);
        assert_eq!(host.active_listeners(), 0);
    }

    #[test]
    fn exhausted_host_rolls_back_registrations() {
        let mut host: EventLoop<ManualClock, 0, 8> =
            EventLoop::new(ManualClock::starting_at(START));
        let result = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host);
        assert!(matches!(result, Err(TankError::HostCapacityExhausted)));
        assert_eq!(host.active_listeners(), 0);
    }

    #[test]
    fn supplied_seed_is_clamped_and_used() {
        let mut host = host();
        let seed = [Sample::new(1, 5_000.0, true), Sample::new(2, -3.0, false)];
        let options = MountOptions {
            seed: &seed,
            ..MountOptions::default()
        };
        let widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();
        let snapshot = widget.snapshot();
        assert_eq!(
            snapshot.as_slice(),
            &[Sample::new(1, 2_000.0, true), Sample::new(2, 0.0, false)]
        );
    }

    #[test]
    fn controlled_mount_mirrors_and_skips_timer() {
        let mut host = host();
        let options = MountOptions {
            inputs: ExternalInputs::controlled(1_234.0, true),
            ..MountOptions::default()
        };
        let widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();

        assert!(!widget.is_ticking());
        assert_eq!(host.active_timers(), 0);
        assert_eq!(
            widget.snapshot().last().copied(),
            Some(Sample::new(START, 1_234.0, true))
        );
    }

    #[test]
    fn ticks_fill_tank_at_inflow_rate() {
        let mut host = host();
        let options = MountOptions {
            inputs: ExternalInputs {
                level: Some(1_000.0),
                motor_on: Some(false),
            },
            ..MountOptions::default()
        };
        let mut widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();
        widget.update(ExternalInputs::none(), &mut host).unwrap();
        widget.toggle_motor(&host);

        tick_seconds(&mut widget, &mut host, 30);
        assert!((widget.state().level - 1_060.0).abs() < 1e-9);
    }

    #[test]
    fn failed_rearm_is_retried_on_the_next_update() {
        let mut host: EventLoop<ManualClock, 1, 8> =
            EventLoop::new(ManualClock::starting_at(START));
        let options = MountOptions {
            inputs: ExternalInputs::controlled(700.0, false),
            ..MountOptions::default()
        };
        let mut widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();
        let foreign = host.start_interval(Duration::from_secs(5)).unwrap();

        let released = widget.update(ExternalInputs::none(), &mut host);
        assert_eq!(released, Err(TankError::HostCapacityExhausted));
        assert_eq!(widget.state().mode, Mode::Uncontrolled);
        assert!(!widget.is_ticking());

        assert!(host.cancel_interval(foreign));
        let outcome = widget.update(ExternalInputs::none(), &mut host).unwrap();
        assert_eq!(outcome.transition, None);
        assert!(widget.is_ticking());
        assert_eq!(host.active_timers(), 1);

        host.clock_mut().advance(Duration::from_secs(1));
        let id = host.poll_due().unwrap();
        assert!(matches!(widget.on_timer(id, &host), Some(TickOutcome::Advanced(_))));
    }

    #[test]
    fn switching_to_controlled_cancels_the_timer() {
        let mut host = host();
        let mut widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();
        tick_seconds(&mut widget, &mut host, 2);

        widget
            .update(ExternalInputs::controlled(500.0, false), &mut host)
            .unwrap();
        assert!(!widget.is_ticking());
        assert_eq!(host.active_timers(), 0);

        let before = widget.snapshot();
        tick_seconds(&mut widget, &mut host, 5);
        assert_eq!(widget.snapshot(), before);

        widget.update(ExternalInputs::none(), &mut host).unwrap();
        assert!(widget.is_ticking());
        assert_eq!(widget.state().mode, Mode::Uncontrolled);
    }

    #[test]
    fn controlled_key_press_calls_handler_without_mutation() {
        let mut host = host();
        let mut proposals: heapless::Vec<bool, 4> = heapless::Vec::new();
        {
            let options = MountOptions {
                inputs: ExternalInputs::controlled(800.0, false),
                ..MountOptions::default()
            };
            let mut widget = TankWidget::<_, 64>::mount(
                options,
                |next: bool| {
                    let _ = proposals.push(next);
                },
                &mut host,
            )
            .unwrap();

            assert_eq!(widget.on_key('M', &host), Some(ToggleOutcome::Proposed(true)));
            assert!(!widget.state().motor_on);
            widget.teardown(&mut host);
        }
        assert_eq!(proposals.as_slice(), &[true]);
    }

    #[test]
    fn other_keys_are_ignored() {
        let mut host = host();
        let mut widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();
        assert_eq!(widget.on_key('x', &host), None);
        assert!(matches!(widget.on_key('m', &host), Some(ToggleOutcome::Toggled(_))));
        assert!(widget.state().motor_on);
    }

    #[test]
    fn resize_reclassifies_layout() {
        let mut host = host();
        let options = MountOptions {
            viewport_width: 1_400,
            ..MountOptions::default()
        };
        let mut widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();
        assert_eq!(widget.layout(), LayoutClass::Wide);
        assert_eq!(widget.on_resize(900), LayoutClass::Narrow);
    }

    #[test]
    fn view_is_cached_until_inputs_change() {
        let mut host = host();
        let mut widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();

        let _ = widget.view();
        let _ = widget.view();
        assert_eq!(widget.view_rebuilds(), 1);

        widget.set_band_overlay(true);
        assert!(widget.view().bands.is_some());
        assert_eq!(widget.view_rebuilds(), 2);

        tick_seconds(&mut widget, &mut host, 1);
        let _ = widget.view();
        assert_eq!(widget.view_rebuilds(), 3);
    }

    #[test]
    fn teardown_releases_every_registration() {
        let mut host = host();
        let widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();
        widget.teardown(&mut host);

        assert_eq!(host.active_timers(), 0);
        assert_eq!(host.active_listeners(), 0);
        host.clock_mut().advance(Duration::from_secs(10));
        assert_eq!(host.poll_due(), None);
    }
}
