//! REPL command grammar.

use std::time::Duration;

use winnow::ascii::{Caseless, alpha1, digit1, float, space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("speed", "speed <mbps>                 - feed a speed-test result"),
    ("press", "press                        - short press of the button"),
    (
        "hold",
        "hold                         - hold the button past the reboot threshold",
    ),
    (
        "advance",
        "advance <n>[ms|s|m|h]        - move the simulated clock forward",
    ),
    (
        "expire",
        "expire                       - jump to the warn timer deadline",
    ),
    (
        "hour",
        "hour <0-23>                  - set the wall-clock hour for quiet hours",
    ),
    ("status", "status                       - show state and outputs"),
    (
        "history",
        "history                      - list recent state transitions",
    ),
    ("help", "help [topic]                 - show help for a command"),
    ("exit", "exit | quit                  - leave the emulator"),
];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command<'a> {
    Speed(f32),
    Press,
    Hold,
    Advance(Duration),
    Expire,
    Hour(u8),
    Status,
    History,
    Help(Option<&'a str>),
    Exit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandError<'a> {
    /// The first word names no command.
    Unknown(&'a str),
    /// A known command with unusable arguments; carries its usage line.
    Usage(&'static str),
}

/// Parses one input line.
///
/// # Errors
///
/// Returns [`CommandError`] when the line is not a valid command.
pub fn parse(line: &str) -> Result<Command<'_>, CommandError<'_>> {
    let line = line.trim();
    let keyword = line.split_whitespace().next().unwrap_or_default();

    terminated(command(), (space0, eof))
        .parse(line)
        .map_err(|_| match usage(keyword) {
            Some(text) => CommandError::Usage(text),
            None => CommandError::Unknown(keyword),
        })
}

/// Usage line for `topic`, matched case-insensitively. `quit` shares the
/// entry for `exit`.
#[must_use]
pub fn usage(topic: &str) -> Option<&'static str> {
    let topic = if topic.eq_ignore_ascii_case("quit") {
        "exit"
    } else {
        topic
    };
    HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        .map(|(_, text)| *text)
}

fn command<'a>() -> impl Parser<&'a str, Command<'a>, ContextError> {
    alt((
        preceded((Caseless("speed"), space1), float).map(Command::Speed),
        preceded((Caseless("advance"), space1), duration()).map(Command::Advance),
        preceded((Caseless("hour"), space1), hour()).map(Command::Hour),
        preceded(Caseless("help"), opt(preceded(space1, alpha1))).map(Command::Help),
        Caseless("history").value(Command::History),
        Caseless("hold").value(Command::Hold),
        Caseless("press").value(Command::Press),
        Caseless("expire").value(Command::Expire),
        Caseless("status").value(Command::Status),
        alt((Caseless("exit"), Caseless("quit"))).value(Command::Exit),
    ))
}

fn duration<'a>() -> impl Parser<&'a str, Duration, ContextError> {
    move |input: &mut &'a str| {
        let amount = digit1
            .verify_map(|digits: &str| digits.parse::<u64>().ok())
            .parse_next(input)?;
        let scale = opt(preceded(space0, unit())).parse_next(input)?;
        Ok(Duration::from_millis(
            amount.saturating_mul(scale.unwrap_or(1_000)),
        ))
    }
}

/// Unit suffix mapped to milliseconds; bare numbers are seconds.
fn unit<'a>() -> impl Parser<&'a str, u64, ContextError> {
    alt((
        Caseless("ms").value(1),
        Caseless("s").value(1_000),
        Caseless("m").value(60_000),
        Caseless("h").value(3_600_000),
    ))
}

fn hour<'a>() -> impl Parser<&'a str, u8, ContextError> {
    digit1.verify_map(|digits: &str| digits.parse::<u8>().ok().filter(|hour| *hour < 24))
}
