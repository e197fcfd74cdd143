use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tank_dashboard::options::{self, HostError, Invocation, Program, USAGE_EXIT_CODE};
use tank_dashboard::{logging, session::Session};

fn main() -> ExitCode {
    let options = match options::parse_args(Program::Console, std::env::args().skip(1)) {
        Ok(Invocation::Run(options)) => options,
        Ok(Invocation::Help) => {
            options::print_help(Program::Console);
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(&error),
    };

    if let Err(error) = logging::init(options.log.as_deref(), "warn") {
        return report(&error);
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(&error),
    }
}

fn run(options: &options::Options) -> Result<(), HostError> {
    let seed = match options.seed.as_deref() {
        Some(path) => options::load_seed(path)?,
        None => Vec::new(),
    };
    let mut session = Session::new(options, &seed)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Tank console ready at t={}. Type `help` for commands or `exit` to quit.",
        session.now()
    )?;

    while !session.is_finished() {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            break;
        }

        for response in session.handle_command(&line)? {
            writeln!(writer, "{response}")?;
        }
    }

    session.close()?;
    Ok(())
}

fn report(error: &HostError) -> ExitCode {
    eprintln!("{}: {error}", Program::Console.name());
    if error.is_usage() {
        eprintln!("Run `{} --help` for usage.", Program::Console.name());
        ExitCode::from(USAGE_EXIT_CODE)
    } else {
        ExitCode::FAILURE
    }
}
