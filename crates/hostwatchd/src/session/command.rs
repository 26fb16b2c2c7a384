//! Tokenizer for the text commands clients send.

use std::time::Duration;

use hostwatch_config::MAX_INTERVAL_SECS;
use hostwatch_protocol::{MonitorKind, MonitorMode};
use thiserror::Error;

use super::registry::TaskId;

/// Values applied when a monitor command omits a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommandDefaults {
    pub(crate) interval: Duration,
    pub(crate) mode: MonitorMode,
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Exit,
    Help,
    Monitors,
    Start {
        kind: MonitorKind,
        mode: MonitorMode,
        interval: Duration,
    },
    Quit(QuitTarget),
    Unknown,
}

/// Argument given to `/quit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QuitTarget {
    /// A well-formed id.
    Id(TaskId),
    /// Text that cannot name any task; echoed back in the not-found reply.
    Invalid(String),
}

/// Reasons a recognised command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum CommandError {
    #[error("Value must be an integer.")]
    InvalidInterval(String),
    #[error("Interval must be at least 1 second.")]
    ZeroInterval,
    #[error("Interval must not exceed {max} seconds.")]
    IntervalTooLong { max: u64 },
    #[error("Mode must be one of: basic, advanced.")]
    InvalidMode(String),
    #[error("Flag {0} was given more than once.")]
    DuplicateFlag(&'static str),
    #[error("Unexpected argument '{0}'.")]
    UnexpectedArgument(String),
    #[error("Please specify a monitor ID to quit.")]
    MissingTaskId,
}

impl Command {
    /// Parses one command line.
    ///
    /// The command word is matched case-insensitively; flag values are not.
    pub(crate) fn parse(input: &str, defaults: CommandDefaults) -> Result<Self, CommandError> {
        let mut tokens = input.split_whitespace();
        let Some(word) = tokens.next() else {
            return Ok(Self::Unknown);
        };
        let word = word.to_ascii_lowercase();
        let rest: Vec<&str> = tokens.collect();

        match word.as_str() {
            "/exit" if rest.is_empty() => Ok(Self::Exit),
            "/help" if rest.is_empty() => Ok(Self::Help),
            "/monitors" if rest.is_empty() => Ok(Self::Monitors),
            "/cpu" => parse_start(MonitorKind::Cpu, &rest, defaults),
            "/mem" => parse_start(MonitorKind::Memory, &rest, defaults),
            "/quit" => parse_quit(&rest),
            _ => Ok(Self::Unknown),
        }
    }
}

fn parse_start(
    kind: MonitorKind,
    args: &[&str],
    defaults: CommandDefaults,
) -> Result<Command, CommandError> {
    let mut interval = None;
    let mut mode = None;
    for arg in args {
        if let Some(value) = arg.strip_prefix("-t=") {
            if interval.replace(parse_interval(value)?).is_some() {
                return Err(CommandError::DuplicateFlag("-t"));
            }
        } else if let Some(value) = arg.strip_prefix("-m=") {
            let parsed = value
                .parse::<MonitorMode>()
                .map_err(|_| CommandError::InvalidMode(value.to_owned()))?;
            if mode.replace(parsed).is_some() {
                return Err(CommandError::DuplicateFlag("-m"));
            }
        } else {
            return Err(CommandError::UnexpectedArgument((*arg).to_owned()));
        }
    }
    Ok(Command::Start {
        kind,
        mode: mode.unwrap_or(defaults.mode),
        interval: interval.unwrap_or(defaults.interval),
    })
}

fn parse_interval(value: &str) -> Result<Duration, CommandError> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(CommandError::InvalidInterval(value.to_owned()));
    }
    let too_long = CommandError::IntervalTooLong {
        max: MAX_INTERVAL_SECS,
    };
    match value.parse::<u64>() {
        Ok(0) => Err(CommandError::ZeroInterval),
        Ok(secs) if secs <= MAX_INTERVAL_SECS => Ok(Duration::from_secs(secs)),
        // All-digit input only fails to parse on overflow.
        Ok(_) | Err(_) => Err(too_long),
    }
}

fn parse_quit(args: &[&str]) -> Result<Command, CommandError> {
    match args {
        [] => Err(CommandError::MissingTaskId),
        [id] => Ok(Command::Quit(match id.parse::<TaskId>() {
            Ok(task_id) => QuitTarget::Id(task_id),
            Err(_) => QuitTarget::Invalid((*id).to_owned()),
        })),
        [_, extra, ..] => Err(CommandError::UnexpectedArgument((*extra).to_owned())),
    }
}
