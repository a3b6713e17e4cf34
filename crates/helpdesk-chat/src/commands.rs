//! Slash-command parsing

use helpdesk_core::{Config, TicketNumber};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Ticket,
    Status(Option<TicketNumber>),
    Submit,
    Cancel,
    Resolve {
        number: TicketNumber,
        time_spent_hours: Option<f64>,
        text: String,
    },
    Close(TicketNumber),
    Stats,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "/help",
            Command::Ticket => "/ticket",
            Command::Status(_) => "/status",
            Command::Submit => "/submit",
            Command::Cancel => "/cancel",
            Command::Resolve { .. } => "/resolve",
            Command::Close(_) => "/close",
            Command::Stats => "/stats",
        }
    }

    /// Commands reserved for elevated roles
    pub fn requires_elevation(&self) -> bool {
        matches!(
            self,
            Command::Resolve { .. } | Command::Close(_) | Command::Stats
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

const RESOLVE_USAGE: &str = "/resolve <ticket number> [<hours>h] <resolution>";
const CLOSE_USAGE: &str = "/close <ticket number>";
const STATUS_USAGE: &str = "/status [ticket number]";

fn parse_hours(token: &str) -> Option<f64> {
    let digits = token.strip_suffix('h').or_else(|| token.strip_suffix('H'))?;
    let hours: f64 = digits.parse().ok()?;
    (hours.is_finite() && hours >= 0.0).then_some(hours)
}

/// Parse a message as a command. Returns `None` for ordinary text.
pub fn parse_command(text: &str, config: &Config) -> Option<Result<Command, CommandError>> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    if !config.recognizes(&name) {
        return Some(Err(CommandError::Unknown(name)));
    }
    let args: Vec<&str> = parts.collect();

    let command = match name.as_str() {
        "/help" => Ok(Command::Help),
        "/ticket" => Ok(Command::Ticket),
        "/submit" => Ok(Command::Submit),
        "/cancel" => Ok(Command::Cancel),
        "/stats" => Ok(Command::Stats),
        "/status" => match args.as_slice() {
            [] => Ok(Command::Status(None)),
            [raw] => TicketNumber::parse(raw)
                .map(|n| Command::Status(Some(n)))
                .ok_or(CommandError::Usage(STATUS_USAGE)),
            _ => Err(CommandError::Usage(STATUS_USAGE)),
        },
        "/close" => match args.as_slice() {
            [raw] => TicketNumber::parse(raw)
                .map(Command::Close)
                .ok_or(CommandError::Usage(CLOSE_USAGE)),
            _ => Err(CommandError::Usage(CLOSE_USAGE)),
        },
        "/resolve" => {
            let number = match args
                .first()
                .and_then(|raw| TicketNumber::parse(raw))
                .ok_or(CommandError::Usage(RESOLVE_USAGE))
            {
                Ok(number) => number,
                Err(e) => return Some(Err(e)),
            };
            let mut rest = &args[1..];
            let time_spent_hours = rest.first().and_then(|t| parse_hours(t));
            if time_spent_hours.is_some() {
                rest = &rest[1..];
            }
            if rest.is_empty() {
                Err(CommandError::Usage(RESOLVE_USAGE))
            } else {
                Ok(Command::Resolve {
                    number,
                    time_spent_hours,
                    text: rest.join(" "),
                })
            }
        }
        other => Err(CommandError::Unknown(other.to_string())),
    };
    Some(command)
}
