use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crossterm::event;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tank_dashboard::app::App;
use tank_dashboard::clock::SystemClock;
use tank_dashboard::{logging, render};
use tank_dashboard::options::{self, HostError, Invocation, Options, Program, USAGE_EXIT_CODE};

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("tank-dashboard.log")
}

fn run(options: &Options) -> Result<(), HostError> {
    let seed = match options.seed.as_deref() {
        Some(path) => options::load_seed(path)?,
        None => Vec::new(),
    };

    render::configure(options.theme);
    let mut guard = TerminalGuard::enter()?;
    let width = guard.terminal.size()?.width;
    let mut app = App::mount(SystemClock, options, &seed, width)?;

    while !app.should_quit() {
        guard.terminal.draw(|frame| app.render(frame))?;
        if event::poll(app.poll_timeout())? {
            app.handle_event(&event::read()?);
        }
        app.pump_timers();
    }

    app.teardown();
    Ok(())
}

fn main() -> ExitCode {
    let options = match options::parse_args(Program::Dashboard, std::env::args().skip(1)) {
        Ok(Invocation::Run(options)) => options,
        Ok(Invocation::Help) => {
            options::print_help(Program::Dashboard);
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(&error),
    };

    let log_path = options.log.clone().unwrap_or_else(default_log_path);
    if let Err(error) = logging::init(Some(&log_path), "info") {
        return report(&error);
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "dashboard stopped");
            report(&error)
        }
    }
}

fn report(error: &HostError) -> ExitCode {
    eprintln!("{}: {error}", Program::Dashboard.name());
    if error.is_usage() {
        eprintln!("Run `{} --help` for usage.", Program::Dashboard.name());
        ExitCode::from(USAGE_EXIT_CODE)
    } else {
        ExitCode::FAILURE
    }
}
