//! Inbound and outbound message types.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::constants::NORMAL_CLOSURE;

/// Kind of frame delivered to the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 application payload.
    Text,
    /// Raw application payload.
    Binary,
    /// Ping control frame (surfaced only when control frames are shown).
    Ping,
    /// Pong control frame (surfaced only when control frames are shown).
    Pong,
}

/// One frame read from the connection. Consumed exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Frame kind.
    pub kind: MessageKind,
    /// Frame payload.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            payload: text.into().into_bytes(),
        }
    }

    /// Binary frame.
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MessageKind::Binary,
            payload: payload.into(),
        }
    }

    /// Ping frame.
    pub fn ping(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MessageKind::Ping,
            payload: payload.into(),
        }
    }

    /// Pong frame.
    pub fn pong(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: MessageKind::Pong,
            payload: payload.into(),
        }
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Render the message the way it is shown to the operator.
    ///
    /// Text is prefixed with `<`, binary is base64 encoded and prefixed with `<<`.
    pub fn describe(&self) -> String {
        match self.kind {
            MessageKind::Text => format!("< {}", self.text_lossy()),
            MessageKind::Binary => format!("<< {}", STANDARD.encode(&self.payload)),
            MessageKind::Ping => "Received ping frame".to_string(),
            MessageKind::Pong => "Received pong frame".to_string(),
        }
    }
}

/// Status code and reason carried by a close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close status code.
    pub code: u16,
    /// Close reason (may be empty).
    pub reason: String,
}

impl CloseInfo {
    /// Create close info from a code and reason.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// 1000 with an empty reason.
    pub fn normal() -> Self {
        Self::new(NORMAL_CLOSURE, String::new())
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, reason: \"{}\"", self.code, self.reason)
    }
}

/// A command parsed from one line of operator input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Send a text frame.
    Text(String),
    /// Send a binary frame.
    Binary(Vec<u8>),
    /// Send an empty ping.
    Ping,
    /// Send an empty pong.
    Pong,
    /// Send a close frame and tear the session down.
    Close {
        /// Close status code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

impl OutboundCommand {
    /// Whether sending this command also ends the session.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Close { .. })
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Close { .. } => "close",
        }
    }
}
