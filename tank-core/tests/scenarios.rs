use core::time::Duration;

use tank_core::host::{EventLoop, HostRuntime, ManualClock};
use tank_core::telemetry::{MirrorOutcome, Mode, TickOutcome, ToggleOutcome, Transition};
use tank_core::{
    ExternalInputs, HistoryBuffer, MountOptions, NoopToggleHandler, Sample, TankError, TankWidget,
    WidgetConfig,
};

type Host = EventLoop<ManualClock>;
type Widget = TankWidget<NoopToggleHandler, 256>;

const START: u64 = 1_700_000_000_000;

fn host() -> Host {
    EventLoop::new(ManualClock::starting_at(START))
}

fn run_seconds(widget: &mut Widget, host: &mut Host, seconds: u64) -> usize {
    let mut ticks = 0;
    for _ in 0..seconds {
        host.clock_mut().advance(Duration::from_secs(1));
        while let Some(id) = host.poll_due() {
            if let Some(TickOutcome::Advanced(_)) = widget.on_timer(id, &*host) {
                ticks += 1;
            }
        }
    }
    ticks
}

fn simulating_from(level: f64, host: &mut Host) -> Widget {
    let options = MountOptions {
        inputs: ExternalInputs {
            level: Some(level),
            motor_on: None,
        },
        ..MountOptions::default()
    };
    Widget::mount(options, NoopToggleHandler, host).unwrap()
}

#[test]
fn thirty_seconds_of_pumping_adds_sixty_liters() {
    for (start_level, expected) in [(500.0, 560.0), (1_980.0, 2_000.0)] {
        let mut host = host();
        let mut widget = simulating_from(start_level, &mut host);
        assert!(matches!(
            widget.toggle_motor(&host),
            ToggleOutcome::Toggled(_)
        ));

        assert_eq!(run_seconds(&mut widget, &mut host, 30), 30);
        assert!((widget.state().level - expected).abs() < 1e-9);
        widget.teardown(&mut host);
    }
}

#[test]
fn draining_stops_at_empty() {
    let mut host = host();
    let mut widget = simulating_from(1.0, &mut host);
    run_seconds(&mut widget, &mut host, 10);
    assert_eq!(widget.state().level, 0.0);
    assert!(widget.snapshot().as_slice().iter().all(|s| s.level >= 0.0));
}

#[test]
fn hover_between_samples_interpolates() {
    let mut history = HistoryBuffer::<8>::new();
    history.append(Sample::new(START, 100.0, false));
    history.append(Sample::new(START + 10, 200.0, true));
    let snapshot = history.snapshot();

    assert_eq!(snapshot.level_at(START + 5), Ok(150.0));
    assert_eq!(snapshot.motor_at(START + 5), Ok(false));
    assert_eq!(snapshot.level_at(START - 1_000), Ok(100.0));
    assert_eq!(snapshot.level_at(START + 1_000), Ok(200.0));
}

#[test]
fn empty_history_reports_no_data() {
    let snapshot = HistoryBuffer::<8>::new().snapshot();
    assert_eq!(snapshot.level_at(START), Err(TankError::NoData));
    assert_eq!(snapshot.readout(START), Err(TankError::NoData));
}

#[test]
fn controlled_stretch_only_records_mirrored_readings() {
    let mut host = host();
    let mut widget = simulating_from(900.0, &mut host);
    run_seconds(&mut widget, &mut host, 5);

    let before = widget.snapshot().len();
    let outcome = widget
        .update(ExternalInputs::controlled(1_200.0, true), &mut host)
        .unwrap();
    assert_eq!(outcome.transition, Some(Transition::EnteredControlled));
    assert_eq!(host.active_timers(), 0);

    let readings = [(1_200.0, true), (1_250.0, true), (1_250.0, false)];
    for &(level, motor_on) in &readings {
        assert_eq!(run_seconds(&mut widget, &mut host, 3), 0);
        widget
            .update(ExternalInputs::controlled(level, motor_on), &mut host)
            .unwrap();
    }

    let recorded: Vec<(f64, bool)> = widget.snapshot().as_slice()[before..]
        .iter()
        .map(|sample| (sample.level, sample.motor_on))
        .collect();
    assert_eq!(recorded, readings);
}

#[test]
fn releasing_control_resumes_the_simulation() {
    let mut host = host();
    let mut widget = simulating_from(900.0, &mut host);
    widget
        .update(ExternalInputs::controlled(100.0, true), &mut host)
        .unwrap();

    let outcome = widget.update(ExternalInputs::none(), &mut host).unwrap();
    assert_eq!(outcome.transition, Some(Transition::Released));
    assert_eq!(outcome.mirror, MirrorOutcome::NotControlled);
    assert_eq!(widget.state().mode, Mode::Uncontrolled);
    assert_eq!(widget.state().level, 900.0);

    assert_eq!(run_seconds(&mut widget, &mut host, 3), 3);
    assert!(widget.state().level < 900.0);
}

#[test]
fn synthesized_seed_precedes_live_samples() {
    let mut host = host();
    let mut widget = Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();
    run_seconds(&mut widget, &mut host, 2);

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.len(), 15);
    assert_eq!(snapshot.first().map(|s| s.timestamp), Some(START - 1_800_000));
    assert!(
        snapshot
            .as_slice()
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    );
}

#[test]
fn history_stays_bounded_under_long_runs() {
    let mut host = host();
    let mut widget = simulating_from(1_000.0, &mut host);
    run_seconds(&mut widget, &mut host, 600);

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.len(), 256);
    assert_eq!(snapshot.last().map(|s| s.timestamp), Some(host.now()));
}

#[test]
fn view_reflects_badges_and_overlay() {
    let mut host = host();
    let options = MountOptions {
        config: WidgetConfig {
            show_band_overlay: true,
            ..WidgetConfig::default()
        },
        inputs: ExternalInputs::controlled(1_950.0, true),
        ..MountOptions::default()
    };
    let mut widget = Widget::mount(options, NoopToggleHandler, &mut host).unwrap();

    let view = widget.view();
    assert!(view.near_full);
    assert!(!view.low_level);
    assert_eq!(view.liters_text.as_str(), "1,950 L");
    let bands = view.bands.as_ref().unwrap();
    assert_eq!(
        bands.first().map(|band| band.start),
        view.snapshot.first().map(|s| s.timestamp)
    );
    assert_eq!(
        bands.last().map(|band| band.end),
        view.snapshot.last().map(|s| s.timestamp)
    );
}

#[test]
fn stalled_host_fires_one_catch_up_tick() {
    let mut host = host();
    let mut widget =
        Widget::mount(MountOptions::default(), NoopToggleHandler, &mut host).unwrap();
    host.clock_mut().advance(Duration::from_secs(2_400));

    let mut ticks = 0;
    while let Some(id) = host.poll_due() {
        if let Some(TickOutcome::Advanced(_)) = widget.on_timer(id, &host) {
            ticks += 1;
        }
    }
    assert_eq!(ticks, 1);

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.len(), 14);
    assert_eq!(
        snapshot.time_range(),
        Some((START - 1_800_000, START + 2_400_000))
    );

    assert_eq!(run_seconds(&mut widget, &mut host, 1), 1);
    assert_eq!(widget.snapshot().len(), 15);
}
