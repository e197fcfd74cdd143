//! Ratatui rendering of a [`DashboardView`].
//!
//! Colors and chart markers are chosen once per process by [`configure`] or,
//! failing that, on the first [`theme`] call; every frame after that reuses the
//! same setup.

use std::sync::OnceLock;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph};
use tank_core::{DashboardView, HoverReadout, LayoutClass, TimeWindow, TimestampMillis};

/// Height of the motor step series as a fraction of capacity.
const MOTOR_TRACE_FRACTION: f64 = 0.1;

/// Terminal background the palette is picked for.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

/// Process-wide renderer setup.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Theme {
    pub marker: Marker,
    pub level: Color,
    pub motor: Color,
    pub band: Color,
    pub threshold: Color,
    pub cursor: Color,
    pub alert: Color,
    pub muted: Color,
}

impl Theme {
    fn detect(variant: ThemeVariant) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
        let basic_term = std::env::var("TERM").is_ok_and(|term| term == "linux" || term == "dumb");
        let theme = Self::select(variant, no_color, basic_term);
        tracing::debug!(?variant, ?theme, "renderer configured");
        theme
    }

    /// Theme for the given background and terminal capabilities.
    pub fn select(variant: ThemeVariant, no_color: bool, basic_term: bool) -> Self {
        let marker = if basic_term {
            Marker::Dot
        } else {
            Marker::Braille
        };
        if no_color {
            return Self {
                marker,
                level: Color::Reset,
                motor: Color::Reset,
                band: Color::Reset,
                threshold: Color::Reset,
                cursor: Color::Reset,
                alert: Color::Reset,
                muted: Color::Reset,
            };
        }
        match variant {
            ThemeVariant::Dark => Self {
                marker,
                level: Color::Cyan,
                motor: Color::Green,
                band: Color::LightGreen,
                threshold: Color::Yellow,
                cursor: Color::Magenta,
                alert: Color::Red,
                muted: Color::DarkGray,
            },
            ThemeVariant::Light => Self {
                marker,
                level: Color::Blue,
                motor: Color::Green,
                band: Color::Green,
                threshold: Color::Rgb(176, 112, 0),
                cursor: Color::Magenta,
                alert: Color::Red,
                muted: Color::Gray,
            },
        }
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// Picks the renderer setup for `variant` unless one is already in use.
pub fn configure(variant: ThemeVariant) -> &'static Theme {
    THEME.get_or_init(|| Theme::detect(variant))
}

/// Returns the renderer setup, detecting a dark theme if none was configured.
pub fn theme() -> &'static Theme {
    configure(ThemeVariant::default())
}

/// Chart state owned by the host rather than the widget.
#[derive(Copy, Clone, Debug)]
pub struct ChartState {
    pub window: TimeWindow,
    pub cursor: Option<HoverReadout>,
}

/// Plot coordinates for one chart frame: x in seconds from the window start,
/// y in liters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartSeries {
    pub x_max: f64,
    pub level: Vec<(f64, f64)>,
    pub motor: Vec<(f64, f64)>,
    pub bands: Vec<[(f64, f64); 2]>,
    pub low: Option<[(f64, f64); 2]>,
    pub high: Option<[(f64, f64); 2]>,
    pub cursor: Option<[(f64, f64); 2]>,
}

impl ChartSeries {
    /// Projects the view's history into the visible window.
    pub fn build<const CAPACITY: usize>(
        view: &DashboardView<CAPACITY>,
        window: &TimeWindow,
        cursor: Option<&HoverReadout>,
    ) -> Self {
        let x = |timestamp: TimestampMillis| seconds_between(window.start(), timestamp);
        let x_max = x(window.end()).max(1.0);
        let snapshot = &view.snapshot;
        let motor_high = view.capacity * MOTOR_TRACE_FRACTION;
        let motor_y = |on: bool| if on { motor_high } else { 0.0 };

        let mut series = Self {
            x_max,
            ..Self::default()
        };
        let (Ok(start_level), Ok(end_level), Ok(start_motor)) = (
            snapshot.level_at(window.start()),
            snapshot.level_at(window.end()),
            snapshot.motor_at(window.start()),
        ) else {
            return series;
        };

        series.level.push((0.0, start_level));
        series.motor.push((0.0, motor_y(start_motor)));
        let mut motor_on = start_motor;
        for sample in snapshot
            .as_slice()
            .iter()
            .filter(|sample| sample.timestamp > window.start() && sample.timestamp < window.end())
        {
            let at = x(sample.timestamp);
            series.level.push((at, sample.level));
            if sample.motor_on != motor_on {
                series.motor.push((at, motor_y(motor_on)));
                series.motor.push((at, motor_y(sample.motor_on)));
                motor_on = sample.motor_on;
            }
        }
        series.level.push((x_max, end_level));
        series.motor.push((x_max, motor_y(motor_on)));

        if let Some(bands) = view.bands.as_ref() {
            series.bands = bands
                .iter()
                .filter(|band| band.motor_on && band.end >= window.start() && band.start <= window.end())
                .map(|band| {
                    let from = x(band.start.max(window.start()));
                    let to = x(band.end.min(window.end()));
                    [(from, view.capacity), (to, view.capacity)]
                })
                .collect();
        }

        if view.show_thresholds {
            series.low = Some([(0.0, view.low_level_liters), (x_max, view.low_level_liters)]);
            series.high = Some([(0.0, view.high_level_liters), (x_max, view.high_level_liters)]);
        }

        series.cursor = cursor
            .filter(|readout| window.contains(readout.timestamp))
            .map(|readout| {
                let at = x(readout.timestamp);
                [(at, 0.0), (at, view.capacity)]
            });
        series
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(from: TimestampMillis, to: TimestampMillis) -> f64 {
    to.saturating_sub(from) as f64 / 1_000.0
}

/// Short relative label such as `-90s`, `-12m` or `now`.
pub fn age_label(age_ms: u64) -> String {
    let seconds = age_ms / 1_000;
    match seconds {
        0 => "now".to_string(),
        1..=119 => format!("-{seconds}s"),
        _ => format!("-{}m", seconds / 60),
    }
}

/// Draws one full frame.
pub fn draw<const CAPACITY: usize>(
    frame: &mut Frame<'_>,
    view: &DashboardView<CAPACITY>,
    chart: &ChartState,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.size());
    let (body, footer) = (rows[0], rows[1]);

    match view.layout {
        LayoutClass::Wide => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(34), Constraint::Min(40)])
                .split(body);
            let left = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(6), Constraint::Length(9)])
                .split(columns[0]);
            draw_diagram(frame, left[0], view);
            draw_details(frame, left[1], view);
            draw_chart(frame, columns[1], view, chart);
        }
        LayoutClass::Narrow => {
            let stack = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(6),
                    Constraint::Length(9),
                    Constraint::Min(8),
                ])
                .split(body);
            draw_diagram(frame, stack[0], view);
            draw_details(frame, stack[1], view);
            draw_chart(frame, stack[2], view, chart);
        }
    }

    draw_footer(frame, footer);
}

fn draw_diagram<const CAPACITY: usize>(frame: &mut Frame<'_>, area: Rect, view: &DashboardView<CAPACITY>) {
    let theme = theme();
    let pump = if view.diagram.motor_on {
        Span::styled(
            " pump ON ",
            Style::default().fg(theme.motor).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(" pump off ", Style::default().fg(theme.muted))
    };
    let block = Block::default()
        .title(Line::from(vec![Span::raw(" Tank "), pump]))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    let (tank, gauge) = (parts[0], parts[1]);

    let filled = filled_rows(view.diagram.level_fraction, tank.height);
    let width = usize::from(tank.width);
    let lines: Vec<Line<'_>> = (0..tank.height)
        .map(|row| {
            if row >= tank.height - filled {
                Line::styled("█".repeat(width), Style::default().fg(theme.level))
            } else {
                Line::raw(" ".repeat(width))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), tank);

    let gauge_color = if view.low_level || view.near_full {
        theme.alert
    } else {
        theme.level
    };
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(gauge_color))
            .ratio(view.fraction)
            .label(format!("{:.1}%", view.percent)),
        gauge,
    );
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn filled_rows(fraction: f64, height: u16) -> u16 {
    let rows = (fraction.clamp(0.0, 1.0) * f64::from(height)).round() as u16;
    rows.min(height)
}

fn draw_details<const CAPACITY: usize>(frame: &mut Frame<'_>, area: Rect, view: &DashboardView<CAPACITY>) {
    let theme = theme();
    let label = Style::default().fg(theme.muted);
    let mut badges = Vec::new();
    if view.low_level {
        badges.push(Span::styled(
            " LOW LEVEL ",
            Style::default()
                .fg(theme.alert)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ));
    }
    if view.near_full {
        badges.push(Span::styled(
            " NEAR FULL ",
            Style::default()
                .fg(theme.threshold)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ));
    }

    let lines = vec![
        Line::from(vec![
            Span::styled("Level     ", label),
            Span::styled(
                view.liters_text.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Fill      ", label),
            Span::raw(format!("{:.1} %", view.percent)),
        ]),
        Line::from(vec![
            Span::styled("Capacity  ", label),
            Span::raw(view.capacity_text.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Motor     ", label),
            Span::styled(
                if view.motor_on { "ON" } else { "OFF" },
                Style::default().fg(if view.motor_on { theme.motor } else { theme.muted }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Mode      ", label),
            Span::raw(view.mode.to_string()),
        ]),
        Line::from(badges),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(" Details ").borders(Borders::ALL)),
        area,
    );
}

fn draw_chart<const CAPACITY: usize>(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &DashboardView<CAPACITY>,
    chart: &ChartState,
) {
    let theme = theme();
    let series = ChartSeries::build(view, &chart.window, chart.cursor.as_ref());

    let mut datasets = Vec::new();
    for band in &series.bands {
        datasets.push(trace(band, theme.band));
    }
    if let Some(low) = series.low.as_ref() {
        datasets.push(trace(low, theme.threshold));
    }
    if let Some(high) = series.high.as_ref() {
        datasets.push(trace(high, theme.threshold));
    }
    datasets.push(trace(&series.motor, theme.motor).name("motor"));
    datasets.push(trace(&series.level, theme.level).name("level"));
    if let Some(cursor) = series.cursor.as_ref() {
        datasets.push(trace(cursor, theme.cursor));
    }

    let latest = view
        .snapshot
        .last()
        .map_or(chart.window.end(), |sample| sample.timestamp);
    let x_labels = vec![
        Span::raw(age_label(latest.saturating_sub(chart.window.start()))),
        Span::raw(age_label(
            latest.saturating_sub(chart.window.start() + chart.window.span() / 2),
        )),
        Span::raw(age_label(latest.saturating_sub(chart.window.end()))),
    ];
    let y_labels = vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", view.capacity / 2.0)),
        Span::raw(view.capacity_text.as_str()),
    ];

    let mut title = vec![Span::raw(" History ")];
    if !chart.window.is_following() {
        title.push(Span::styled("[paused] ", Style::default().fg(theme.muted)));
    }
    if let Some(readout) = chart.cursor.as_ref() {
        title.push(Span::styled(
            format!(
                "{} {:.1} L pump {} ",
                age_label(latest.saturating_sub(readout.timestamp)),
                readout.level,
                if readout.motor_on { "on" } else { "off" }
            ),
            Style::default().fg(theme.cursor),
        ));
    }

    let widget = Chart::new(datasets)
        .block(Block::default().title(Line::from(title)).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, series.x_max])
                .labels(x_labels)
                .style(Style::default().fg(theme.muted)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, view.capacity])
                .labels(y_labels)
                .style(Style::default().fg(theme.muted)),
        );
    frame.render_widget(widget, area);
}

fn trace(data: &[(f64, f64)], color: Color) -> Dataset<'_> {
    Dataset::default()
        .marker(theme().marker)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(data)
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect) {
    let theme = theme();
    let hint = Line::styled(
        "m motor  ←/→ cursor  +/- zoom  [/] pan  f follow  b bands  q quit",
        Style::default().fg(theme.muted),
    );
    frame.render_widget(Paragraph::new(hint), area);
}
