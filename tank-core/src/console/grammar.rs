#![allow(clippy::module_name_repetitions)]

//! Parser for console command lines.
//!
//! Lines are short and whitespace-separated, so the parser runs `winnow`
//! combinators straight over the `&str` without a separate token pass. The
//! keyword is looked up in the [`catalog`](super::catalog) and each command
//! parses its own arguments.

use winnow::ascii::{alpha1, dec_uint, float, space0, space1};
use winnow::combinator::{eof, opt, preceded};
use winnow::prelude::*;

use super::catalog::{self, CommandSpec, CommandTag};
use super::{Command, ConsoleError};
use crate::sample::TimestampMillis;

/// Parses one console line.
///
/// # Errors
///
/// Returns [`ConsoleError::Empty`] for a blank line,
/// [`ConsoleError::UnknownCommand`] when the keyword is not in the catalog and
/// [`ConsoleError::Syntax`] when the arguments do not match the command's
/// usage.
pub fn parse(line: &str) -> Result<Command<'_>, ConsoleError<'_>> {
    let leading = line.len() - line.trim_start().len();
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::Empty);
    }

    let mut input = trimmed;
    let word = keyword(&mut input).map_err(|_| ConsoleError::Syntax {
        usage: "command keyword",
        column: leading,
    })?;
    let spec = catalog::find(word).ok_or(ConsoleError::UnknownCommand(word))?;

    let column = leading + trimmed.len() - input.len();
    match arguments(spec.tag, &mut input) {
        Ok(command) if end_of_line(&mut input).is_ok() => Ok(command),
        _ => Err(syntax(spec, column)),
    }
}

fn syntax(spec: &CommandSpec, column: usize) -> ConsoleError<'static> {
    ConsoleError::Syntax {
        usage: spec.usage,
        column,
    }
}

fn keyword<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    alpha1.parse_next(input)
}

fn end_of_line(input: &mut &str) -> ModalResult<()> {
    (space0, eof).void().parse_next(input)
}

fn arguments<'s>(tag: CommandTag, input: &mut &'s str) -> ModalResult<Command<'s>> {
    match tag {
        CommandTag::Tick => opt(preceded(space1, dec_uint::<_, u32, _>))
            .map(|seconds| Command::Tick {
                seconds: seconds.unwrap_or(1),
            })
            .parse_next(input),
        CommandTag::Toggle => Ok(Command::Toggle),
        CommandTag::Set => (
            preceded(space1, float::<_, f64, _>),
            preceded(space1, on_off),
        )
            .map(|(level, motor_on)| Command::Set { level, motor_on })
            .parse_next(input),
        CommandTag::Release => Ok(Command::Release),
        CommandTag::At => preceded(space1, timestamp)
            .map(Command::At)
            .parse_next(input),
        CommandTag::Ago => preceded(space1, dec_uint::<_, u64, _>)
            .map(|seconds| Command::Ago { seconds })
            .parse_next(input),
        CommandTag::Bands => opt(preceded(space1, on_off))
            .map(Command::Bands)
            .parse_next(input),
        CommandTag::History => opt(preceded(space1, dec_uint::<_, u32, _>))
            .map(|count| Command::History { count })
            .parse_next(input),
        CommandTag::Status => Ok(Command::Status),
        CommandTag::Help => opt(preceded(space1, alpha1))
            .map(|topic| Command::Help { topic })
            .parse_next(input),
        CommandTag::Exit => Ok(Command::Exit),
    }
}

fn timestamp(input: &mut &str) -> ModalResult<TimestampMillis> {
    dec_uint.parse_next(input)
}

fn on_off(input: &mut &str) -> ModalResult<bool> {
    alpha1
        .verify_map(|word: &str| {
            if word.eq_ignore_ascii_case("on") {
                Some(true)
            } else if word.eq_ignore_ascii_case("off") {
                Some(false)
            } else {
                None
            }
        })
        .parse_next(input)
}
