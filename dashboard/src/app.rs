//! Terminal dashboard state: the widget, its host loop and the chart window.

use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use tank_core::telemetry::{TickOutcome, ToggleOutcome};
use tank_core::{
    Clock, EventLoop, HostRuntime, HoverReadout, ListenerKind, MountOptions, NoopToggleHandler, Sample,
    TankWidget, TimeWindow, TimestampMillis,
};
use tracing::{debug, info};

use crate::clock::SystemClock;
use crate::options::{HostError, Options};
use crate::render::{self, ChartState};

/// Cursor steps across the visible window.
pub const CURSOR_STEPS: f64 = 60.0;
/// Longest wait between event polls.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(250);

const ZOOM_IN: f64 = 0.5;
const ZOOM_OUT: f64 = 2.0;

pub struct App<C: Clock = SystemClock> {
    host: EventLoop<C>,
    widget: TankWidget<NoopToggleHandler>,
    window: TimeWindow,
    /// Cursor position as a fraction of the window; `None` hides it.
    cursor: Option<f64>,
    quit: bool,
}

impl<C: Clock> App<C> {
    /// Mounts an uncontrolled widget on `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Widget`] when the widget cannot be mounted.
    pub fn mount(clock: C, options: &Options, seed: &[Sample], width: u16) -> Result<Self, HostError> {
        let mut host = EventLoop::new(clock);
        let mount = MountOptions {
            config: options.config,
            seed,
            viewport_width: width,
            ..MountOptions::default()
        };
        let widget = TankWidget::mount(mount, NoopToggleHandler, &mut host)?;
        let bounds = widget
            .snapshot()
            .time_range()
            .unwrap_or((host.now(), host.now()));

        info!(
            capacity = options.config.capacity,
            layout = ?widget.layout(),
            samples = widget.snapshot().len(),
            "dashboard mounted"
        );
        Ok(Self {
            host,
            widget,
            window: TimeWindow::covering(bounds),
            cursor: None,
            quit: false,
        })
    }

    /// Fires every due timer. Returns the number of simulation ticks.
    pub fn pump_timers(&mut self) -> usize {
        let mut ticks = 0;
        while let Some(id) = self.host.poll_due() {
            if let Some(TickOutcome::Advanced(sample)) = self.widget.on_timer(id, &self.host) {
                ticks += 1;
                debug!(level = sample.level, motor_on = sample.motor_on, "tick");
            }
        }
        if ticks > 0 {
            self.sync_window();
        }
        ticks
    }

    /// Time until the next timer is due, capped at [`MAX_POLL_INTERVAL`].
    pub fn poll_timeout(&self) -> Duration {
        self.host.next_deadline().map_or(MAX_POLL_INTERVAL, |deadline| {
            Duration::from_millis(deadline.saturating_sub(self.host.now())).min(MAX_POLL_INTERVAL)
        })
    }

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(width, _) if self.host.has_listener(ListenerKind::Resize) => {
                let layout = self.widget.on_resize(*width);
                debug!(width, ?layout, "viewport resized");
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        let bounds = self.bounds();
        let anchor = self.anchor();
        let step = self.pan_step();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char(ch @ ('m' | 'M')) if self.host.has_listener(ListenerKind::Keyboard) => {
                if let Some(ToggleOutcome::Toggled(sample)) = self.widget.on_key(ch, &self.host) {
                    info!(motor_on = sample.motor_on, level = sample.level, "motor toggled");
                    self.sync_window();
                }
            }
            KeyCode::Left => self.move_cursor(-1.0),
            KeyCode::Right => self.move_cursor(1.0),
            KeyCode::Char('+' | '=') => self.window.zoom(ZOOM_IN, anchor, bounds),
            KeyCode::Char('-') => self.window.zoom(ZOOM_OUT, anchor, bounds),
            KeyCode::Char('[') => self.window.pan(-step, bounds),
            KeyCode::Char(']') => self.window.pan(step, bounds),
            KeyCode::Char('f') => {
                self.window.follow_live(bounds);
                self.cursor = None;
            }
            KeyCode::Char('b') => {
                let enabled = !self.widget.band_overlay();
                self.widget.set_band_overlay(enabled);
                info!(enabled, "band overlay switched");
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, direction: f64) {
        let current = self.cursor.unwrap_or(1.0);
        self.cursor = Some((current + direction / CURSOR_STEPS).clamp(0.0, 1.0));
    }

    fn anchor(&self) -> TimestampMillis {
        self.cursor
            .map_or(self.window.end(), |fraction| self.window.timestamp_at(fraction))
    }

    fn pan_step(&self) -> i64 {
        i64::try_from(self.window.span() / 4).unwrap_or(i64::MAX)
    }

    fn bounds(&self) -> (TimestampMillis, TimestampMillis) {
        self.widget
            .snapshot()
            .time_range()
            .unwrap_or((self.window.start(), self.window.end()))
    }

    fn sync_window(&mut self) {
        let bounds = self.bounds();
        self.window.sync(bounds);
    }

    /// Hover readout under the cursor.
    pub fn cursor_readout(&self) -> Option<HoverReadout> {
        let fraction = self.cursor?;
        self.widget
            .snapshot()
            .readout(self.window.timestamp_at(fraction))
            .ok()
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let chart = ChartState {
            window: self.window,
            cursor: self.cursor_readout(),
        };
        let view = self.widget.view();
        render::draw(frame, view, &chart);
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn widget(&self) -> &TankWidget<NoopToggleHandler> {
        &self.widget
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn host(&self) -> &EventLoop<C> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut EventLoop<C> {
        &mut self.host
    }

    /// Releases the widget's host registrations.
    pub fn teardown(self) {
        let Self {
            mut host, widget, ..
        } = self;
        widget.teardown(&mut host);
        debug!(timers = host.active_timers(), "dashboard torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tank_core::{LayoutClass, ManualClock, WidgetConfig};

    use crate::options::TERMINAL_NARROW_BREAKPOINT;

    const START: u64 = 1_700_000_000_000;

    fn app() -> App<ManualClock> {
        let options = Options {
            config: WidgetConfig {
                narrow_breakpoint: TERMINAL_NARROW_BREAKPOINT,
                ..WidgetConfig::default()
            },
            ..Options::default()
        };
        App::mount(ManualClock::starting_at(START), &options, &[], 200).unwrap()
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn advance(app: &mut App<ManualClock>, seconds: u64) -> usize {
        let mut ticks = 0;
        for _ in 0..seconds {
            app.host_mut().clock_mut().advance(Duration::from_secs(1));
            ticks += app.pump_timers();
        }
        ticks
    }

    #[test]
    fn ticks_follow_the_live_edge() {
        let mut app = app();
        assert_eq!(advance(&mut app, 5), 5);
        assert!(app.window().is_following());
        assert_eq!(app.window().end(), START + 5_000);
        assert_eq!(app.poll_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn m_key_toggles_the_simulated_motor() {
        let mut app = app();
        let before = app.widget().state().motor_on;
        app.handle_event(&key(KeyCode::Char('m')));
        assert_eq!(app.widget().state().motor_on, !before);
    }

    #[test]
    fn cursor_reads_history_under_it() {
        let mut app = app();
        assert!(app.cursor_readout().is_none());
        app.handle_event(&key(KeyCode::Left));
        let readout = app.cursor_readout().unwrap();
        assert!(readout.timestamp < START);
        assert!(app.window().contains(readout.timestamp));
    }

    #[test]
    fn zoom_and_follow() {
        let mut app = app();
        let span = app.window().span();
        app.handle_event(&key(KeyCode::Char('+')));
        assert_eq!(app.window().span(), span / 2);

        app.handle_event(&key(KeyCode::Char('[')));
        assert!(!app.window().is_following());

        app.handle_event(&key(KeyCode::Char('f')));
        assert!(app.window().is_following());
        let newest = app.widget().snapshot().last().map(|sample| sample.timestamp);
        assert_eq!(newest, Some(START - 60_000));
        assert_eq!(Some(app.window().end()), newest);
    }

    #[test]
    fn resize_and_overlay_keys() {
        let mut app = app();
        assert_eq!(app.widget().layout(), LayoutClass::Wide);
        app.handle_event(&Event::Resize(40, 20));
        assert_eq!(app.widget().layout(), LayoutClass::Narrow);

        app.handle_event(&key(KeyCode::Char('b')));
        assert!(app.widget().band_overlay());

        app.handle_event(&key(KeyCode::Char('q')));
        assert!(app.should_quit());
    }
}
