//! Command-line options shared by the terminal dashboard and the console.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tank_core::config::MirrorPolicy;
use tank_core::{Sample, TankError, TimestampMillis, WidgetConfig};
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

use crate::render::ThemeVariant;

/// Exit status for rejected command lines.
pub const USAGE_EXIT_CODE: u8 = 2;

/// Narrow/wide breakpoint measured in terminal columns.
pub const TERMINAL_NARROW_BREAKPOINT: u16 = 100;

/// Errors raised by the host binaries before or around the widget.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{flag} requires a value")]
    MissingValue { flag: &'static str },
    #[error("{flag}: `{value}` is not a valid value")]
    InvalidValue { flag: &'static str, value: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("cannot read seed file {}: {source}", path.display())]
    SeedIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("seed file {} is not a JSON sample array: {source}", path.display())]
    SeedFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Widget(#[from] TankError),
    #[error("cannot install log subscriber: {0}")]
    Logging(#[from] TryInitError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HostError {
    /// Returns `true` for errors caused by the command line itself.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingValue { .. }
                | Self::InvalidValue { .. }
                | Self::UnknownArgument(_)
                | Self::Widget(TankError::InvalidConfiguration(_))
        )
    }
}

/// Which binary is parsing; the console accepts a few extra flags.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Program {
    Dashboard,
    Console,
}

impl Program {
    pub fn name(self) -> &'static str {
        match self {
            Program::Dashboard => "tank-dashboard",
            Program::Console => "tank-console",
        }
    }
}

/// Parsed command line.
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub config: WidgetConfig,
    pub seed: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub start: Option<TimestampMillis>,
    pub theme: ThemeVariant,
}

/// Result of parsing: either options to run with or a help request.
#[derive(Clone, Debug)]
pub enum Invocation {
    Run(Options),
    Help,
}

/// Parses the arguments following the program name.
///
/// # Errors
///
/// Returns a usage [`HostError`] for unknown flags, missing values or
/// unparseable numbers, and [`HostError::Widget`] when the resulting
/// configuration is rejected.
pub fn parse_args<I>(program: Program, args: I) -> Result<Invocation, HostError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    if program == Program::Dashboard {
        options.config.narrow_breakpoint = TERMINAL_NARROW_BREAKPOINT;
    }

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--capacity" => options.config.capacity = number(&mut args, "--capacity")?,
            "--inflow" => options.config.flow.inflow_lpm = number(&mut args, "--inflow")?,
            "--outflow" => options.config.flow.outflow_lpm = number(&mut args, "--outflow")?,
            "--low" => options.config.thresholds.low_pct = number(&mut args, "--low")?,
            "--high" => options.config.thresholds.high_pct = number(&mut args, "--high")?,
            "--bands" => options.config.show_band_overlay = true,
            "--no-thresholds" => options.config.show_thresholds = false,
            "--mirror" => options.config.mirror_policy = mirror_policy(&mut args)?,
            "--seed" => options.seed = Some(path(&mut args, "--seed")?),
            "--log" => options.log = Some(path(&mut args, "--log")?),
            "--transcript" if program == Program::Console => {
                options.transcript = Some(path(&mut args, "--transcript")?);
            }
            "--start" if program == Program::Console => {
                options.start = Some(number(&mut args, "--start")?);
            }
            "--theme" if program == Program::Dashboard => options.theme = theme_variant(&mut args)?,
            "-h" | "--help" => return Ok(Invocation::Help),
            _ => return Err(HostError::UnknownArgument(arg)),
        }
    }

    options.config.validate()?;
    Ok(Invocation::Run(options))
}

fn value<I>(args: &mut I, flag: &'static str) -> Result<String, HostError>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or(HostError::MissingValue { flag })
}

fn number<I, N>(args: &mut I, flag: &'static str) -> Result<N, HostError>
where
    I: Iterator<Item = String>,
    N: std::str::FromStr,
{
    let raw = value(args, flag)?;
    raw.trim()
        .parse()
        .map_err(|_| HostError::InvalidValue { flag, value: raw })
}

fn path<I>(args: &mut I, flag: &'static str) -> Result<PathBuf, HostError>
where
    I: Iterator<Item = String>,
{
    value(args, flag).map(PathBuf::from)
}

fn mirror_policy<I>(args: &mut I) -> Result<MirrorPolicy, HostError>
where
    I: Iterator<Item = String>,
{
    let raw = value(args, "--mirror")?;
    match raw.as_str() {
        "change" => Ok(MirrorPolicy::OnChange),
        "every" => Ok(MirrorPolicy::EveryUpdate),
        _ => Err(HostError::InvalidValue {
            flag: "--mirror",
            value: raw,
        }),
    }
}

fn theme_variant<I>(args: &mut I) -> Result<ThemeVariant, HostError>
where
    I: Iterator<Item = String>,
{
    let raw = value(args, "--theme")?;
    match raw.as_str() {
        "dark" => Ok(ThemeVariant::Dark),
        "light" => Ok(ThemeVariant::Light),
        _ => Err(HostError::InvalidValue {
            flag: "--theme",
            value: raw,
        }),
    }
}

/// Loads a seed history from a JSON array of `{ "ts", "level", "motor" }`
/// objects, sorted by timestamp.
///
/// # Errors
///
/// Returns [`HostError::SeedIo`] when the file cannot be read and
/// [`HostError::SeedFormat`] when it is not a sample array.
pub fn load_seed(path: &Path) -> Result<Vec<Sample>, HostError> {
    let raw = fs::read_to_string(path).map_err(|source| HostError::SeedIo {
        path: path.to_path_buf(),
        source,
    })?;
    let mut samples = parse_seed(&raw).map_err(|source| HostError::SeedFormat {
        path: path.to_path_buf(),
        source,
    })?;

    if !samples
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    {
        tracing::warn!(path = %path.display(), "seed samples out of order; sorting by timestamp");
        samples.sort_by_key(|sample| sample.timestamp);
    }
    tracing::debug!(path = %path.display(), samples = samples.len(), "loaded seed history");
    Ok(samples)
}

fn parse_seed(raw: &str) -> Result<Vec<Sample>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Prints the usage text for `program`.
pub fn print_help(program: Program) {
    println!("{}", program.name());
    println!();
    println!("Usage:");
    match program {
        Program::Dashboard => println!("  tank-dashboard [options] [--theme <dark|light>]"),
        Program::Console => {
            println!("  tank-console [options] [--transcript <file>] [--start <ms>]");
        }
    }
    println!();
    println!("Options:");
    println!("  --capacity <liters>    Tank capacity (default 2000)");
    println!("  --inflow <l/min>       Pump inflow while the motor runs (default 120)");
    println!("  --outflow <l/min>      Drain rate while the motor is off (default 20)");
    println!("  --low <percent>        LOW LEVEL badge threshold (default 20)");
    println!("  --high <percent>       NEAR FULL badge threshold (default 95)");
    println!("  --bands                Start with the motor band overlay enabled");
    println!("  --no-thresholds        Hide threshold lines on the chart");
    println!("  --mirror <change|every>  When controlled readings are recorded");
    println!("  --seed <file.json>     Initial history as [{{\"ts\", \"level\", \"motor\"}}]");
    println!("  --log <file>           Write logs to a file");
    if program == Program::Dashboard {
        println!("  --theme <dark|light>   Palette for the terminal background (default dark)");
    }
    if program == Program::Console {
        println!("  --transcript <file>    Record input and output with clock offsets");
        println!("  --start <ms>           Initial clock value in epoch milliseconds");
    }
    println!("  -h, --help             Show this help message");
    println!();
    println!("Environment:");
    println!("  TANK_DASHBOARD_LOG=<directives>  (falls back to RUST_LOG)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(program: Program, args: &[&str]) -> Result<Invocation, HostError> {
        parse_args(program, args.iter().map(ToString::to_string))
    }

    fn run(program: Program, args: &[&str]) -> Options {
        match parse(program, args) {
            Ok(Invocation::Run(options)) => options,
            other => panic!("expected options, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_the_stock_tank() {
        let options = run(Program::Console, &[]);
        assert_eq!(options.config, WidgetConfig::default());
        assert!(options.seed.is_none());
        assert!(options.transcript.is_none());
    }

    #[test]
    fn dashboard_measures_breakpoint_in_columns() {
        let options = run(Program::Dashboard, &[]);
        assert_eq!(options.config.narrow_breakpoint, TERMINAL_NARROW_BREAKPOINT);
    }

    #[test]
    fn numeric_flags_override_config() {
        let options = run(
            Program::Console,
            &[
                "--capacity", "500", "--inflow", "60", "--outflow", "5", "--low", "10",
                "--high", "90", "--bands", "--mirror", "every", "--start", "42",
            ],
        );
        assert_eq!(options.config.capacity, 500.0);
        assert_eq!(options.config.flow.inflow_lpm, 60.0);
        assert_eq!(options.config.flow.outflow_lpm, 5.0);
        assert_eq!(options.config.thresholds.low_pct, 10.0);
        assert_eq!(options.config.thresholds.high_pct, 90.0);
        assert!(options.config.show_band_overlay);
        assert_eq!(options.config.mirror_policy, MirrorPolicy::EveryUpdate);
        assert_eq!(options.start, Some(42));
    }

    #[test]
    fn theme_flag_selects_the_palette() {
        assert_eq!(run(Program::Dashboard, &[]).theme, ThemeVariant::Dark);
        assert_eq!(
            run(Program::Dashboard, &["--theme", "light"]).theme,
            ThemeVariant::Light
        );

        let invalid = parse(Program::Dashboard, &["--theme", "sepia"]).unwrap_err();
        assert_eq!(invalid.to_string(), "--theme: `sepia` is not a valid value");
        assert!(matches!(
            parse(Program::Console, &["--theme", "light"]),
            Err(HostError::UnknownArgument(_))
        ));
    }

    #[test]
    fn console_only_flags_are_rejected_by_the_dashboard() {
        let error = parse(Program::Dashboard, &["--transcript", "out.log"]).unwrap_err();
        assert!(matches!(error, HostError::UnknownArgument(ref arg) if arg == "--transcript"));
        assert!(error.is_usage());
    }

    #[test]
    fn bad_values_are_usage_errors() {
        let missing = parse(Program::Console, &["--capacity"]).unwrap_err();
        assert!(matches!(missing, HostError::MissingValue { flag: "--capacity" }));

        let invalid = parse(Program::Console, &["--inflow", "fast"]).unwrap_err();
        assert_eq!(invalid.to_string(), "--inflow: `fast` is not a valid value");

        let rejected = parse(Program::Console, &["--capacity", "0"]).unwrap_err();
        assert!(matches!(rejected, HostError::Widget(_)));
        assert!(rejected.is_usage());
    }

    #[test]
    fn help_short_circuits() {
        assert!(matches!(
            parse(Program::Console, &["--help", "--bogus"]),
            Ok(Invocation::Help)
        ));
    }

    #[test]
    fn seed_json_uses_short_field_names() {
        let samples =
            parse_seed(r#"[{"ts": 1000, "level": 12.5, "motor": true}]"#).unwrap();
        assert_eq!(samples, vec![Sample::new(1_000, 12.5, true)]);
        assert!(parse_seed(r#"{"ts": 1}"#).is_err());
    }
}
