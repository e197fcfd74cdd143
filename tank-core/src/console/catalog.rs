//! Console command table shared by the parser and the `help` command.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Tick,
    Toggle,
    Set,
    Release,
    At,
    Ago,
    Bands,
    History,
    Status,
    Help,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

const COMMANDS: [CommandSpec; 12] = [
    CommandSpec {
        name: "tick",
        tag: CommandTag::Tick,
        usage: "tick [seconds]",
        summary: "advance the clock and fire due timers",
    },
    CommandSpec {
        name: "toggle",
        tag: CommandTag::Toggle,
        usage: "toggle",
        summary: "toggle the motor (proposes a change while controlled)",
    },
    CommandSpec {
        name: "set",
        tag: CommandTag::Set,
        usage: "set <level> <on|off>",
        summary: "supply external readings and take control",
    },
    CommandSpec {
        name: "release",
        tag: CommandTag::Release,
        usage: "release",
        summary: "stop supplying readings and resume the simulation",
    },
    CommandSpec {
        name: "at",
        tag: CommandTag::At,
        usage: "at <millis>",
        summary: "level and motor state at an absolute timestamp",
    },
    CommandSpec {
        name: "ago",
        tag: CommandTag::Ago,
        usage: "ago <seconds>",
        summary: "level and motor state relative to now",
    },
    CommandSpec {
        name: "bands",
        tag: CommandTag::Bands,
        usage: "bands [on|off]",
        summary: "list motor bands or switch the overlay",
    },
    CommandSpec {
        name: "history",
        tag: CommandTag::History,
        usage: "history [count]",
        summary: "print the most recent samples",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        usage: "status",
        summary: "print the current reading and badges",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "list commands or describe one",
    },
    CommandSpec {
        name: "exit",
        tag: CommandTag::Exit,
        usage: "exit",
        summary: "leave the console",
    },
    CommandSpec {
        name: "quit",
        tag: CommandTag::Exit,
        usage: "quit",
        summary: "leave the console",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}
