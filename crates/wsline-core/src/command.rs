//! Console command grammar.
//!
//! With the control prefix enabled, a line starting with the prefix is parsed
//! as a command:
//!
//! ```text
//! /ping
//! /pong
//! /text <payload>
//! /binary <base64>
//! /close [code [reason words...]]
//! ```
//!
//! Anything else (or every line, when the prefix is disabled) is literal text.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::constants::NORMAL_CLOSURE;
use crate::message::OutboundCommand;

/// A line that could not be turned into a command. Nothing is transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The line was just the prefix.
    #[error("empty control command")]
    EmptyCommand,
    /// The command name is not part of the grammar.
    #[error("unknown control command: \"{0}\"")]
    UnknownCommand(String),
    /// `/binary` parameter is not standard base64.
    #[error("invalid string in base64: \"{0}\"")]
    InvalidBase64(String),
    /// A command that needs a parameter got none.
    #[error("missing payload for /{0}")]
    MissingPayload(String),
    /// `/close` code is not a number in `0..=65535`.
    #[error("invalid close status code: \"{0}\"")]
    InvalidCloseCode(String),
}

/// Parses console lines into [`OutboundCommand`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandParser {
    prefix: Option<char>,
}

impl CommandParser {
    /// Parser that treats every line as text.
    pub fn literal() -> Self {
        Self { prefix: None }
    }

    /// Parser that interprets lines starting with `prefix` as commands.
    pub fn with_prefix(prefix: char) -> Self {
        Self {
            prefix: Some(prefix),
        }
    }

    /// Build from the settings pair (enabled flag, prefix character).
    pub fn from_settings(enabled: bool, prefix: char) -> Self {
        if enabled {
            Self::with_prefix(prefix)
        } else {
            Self::literal()
        }
    }

    /// The active control prefix, if any.
    pub fn prefix(&self) -> Option<char> {
        self.prefix
    }

    /// Classify one line of input.
    pub fn parse(&self, line: &str) -> Result<OutboundCommand, CommandError> {
        let Some(body) = self.prefix.and_then(|p| line.strip_prefix(p)) else {
            return Ok(OutboundCommand::Text(line.to_string()));
        };

        let (name, param) = match body.find(char::is_whitespace) {
            Some(idx) => (&body[..idx], body[idx..].trim_start()),
            None => (body, ""),
        };

        match name {
            "" => Err(CommandError::EmptyCommand),
            "ping" => Ok(OutboundCommand::Ping),
            "pong" => Ok(OutboundCommand::Pong),
            "text" => Ok(OutboundCommand::Text(param.to_string())),
            "binary" => parse_binary(param),
            "close" => parse_close(param),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_binary(param: &str) -> Result<OutboundCommand, CommandError> {
    let encoded = param.trim_end();
    if encoded.is_empty() {
        return Err(CommandError::MissingPayload("binary".into()));
    }
    STANDARD
        .decode(encoded)
        .map(OutboundCommand::Binary)
        .map_err(|_| CommandError::InvalidBase64(encoded.to_string()))
}

fn parse_close(param: &str) -> Result<OutboundCommand, CommandError> {
    let mut tokens = param.split_whitespace();
    let code = match tokens.next() {
        Some(token) => token
            .parse::<u16>()
            .map_err(|_| CommandError::InvalidCloseCode(token.to_string()))?,
        None => NORMAL_CLOSURE,
    };
    let reason = tokens.collect::<Vec<_>>().join(" ");
    Ok(OutboundCommand::Close { code, reason })
}
