//! Library-neutral frame model.
//!
//! The client speaks `tokio-tungstenite` and the echo server speaks `axum`;
//! both message types convert through [`Frame`] so the read loop and write
//! path are written once.

use std::error::Error as StdError;
use std::fmt;

use axum::extract::ws as axum_ws;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use wsline_core::constants::{INVALID_PAYLOAD, MESSAGE_TOO_BIG, PROTOCOL_ERROR};
use wsline_core::{CloseInfo, OutboundCommand};

/// One WebSocket frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping control frame.
    Ping(Vec<u8>),
    /// Pong control frame.
    Pong(Vec<u8>),
    /// Close control frame, with or without a status payload.
    Close(Option<CloseInfo>),
}

impl From<OutboundCommand> for Frame {
    fn from(command: OutboundCommand) -> Self {
        match command {
            OutboundCommand::Text(text) => Self::Text(text),
            OutboundCommand::Binary(payload) => Self::Binary(payload),
            OutboundCommand::Ping => Self::Ping(Vec::new()),
            OutboundCommand::Pong => Self::Pong(Vec::new()),
            OutboundCommand::Close { code, reason } => Self::Close(Some(CloseInfo::new(code, reason))),
        }
    }
}

/// A library message that converts to and from [`Frame`].
pub trait WireMessage: Sized + Send + Unpin + 'static {
    /// Convert into a frame. Raw frames that are not complete messages map to `None`.
    fn into_frame(self) -> Option<Frame>;
    /// Build a library message from a frame.
    fn from_frame(frame: Frame) -> Self;
}

/// Read-side error classification.
///
/// Both libraries end the stream after any read error, so every error is
/// final. What differs is whether the peer broke the protocol and is owed a
/// close status explaining why.
pub trait WireError: fmt::Display + Send + 'static {
    /// Close status for a peer protocol violation, `None` when the transport failed.
    fn violation_code(&self) -> Option<u16>;
}

// ─────────────────────────────────────────────────────────────────────────────
// tungstenite
// ─────────────────────────────────────────────────────────────────────────────

impl WireMessage for tungstenite::Message {
    fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            Self::Binary(data) => Some(Frame::Binary(data.to_vec())),
            Self::Ping(data) => Some(Frame::Ping(data.to_vec())),
            Self::Pong(data) => Some(Frame::Pong(data.to_vec())),
            Self::Close(frame) => Some(Frame::Close(frame.map(|f| {
                CloseInfo::new(u16::from(f.code), f.reason.as_str())
            }))),
            Self::Frame(_) => None,
        }
    }

    fn from_frame(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text.into()),
            Frame::Binary(data) => Self::Binary(data.into()),
            Frame::Ping(data) => Self::Ping(data.into()),
            Frame::Pong(data) => Self::Pong(data.into()),
            Frame::Close(info) => Self::Close(info.map(|info| CloseFrame {
                code: CloseCode::from(info.code),
                reason: info.reason.into(),
            })),
        }
    }
}

impl WireError for tungstenite::Error {
    fn violation_code(&self) -> Option<u16> {
        match self {
            Self::Protocol(ProtocolError::ResetWithoutClosingHandshake) => None,
            Self::Protocol(_) => Some(PROTOCOL_ERROR),
            Self::Utf8 { .. } => Some(INVALID_PAYLOAD),
            Self::Capacity(_) => Some(MESSAGE_TOO_BIG),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// axum
// ─────────────────────────────────────────────────────────────────────────────

impl WireMessage for axum_ws::Message {
    fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
            Self::Binary(data) => Some(Frame::Binary(data.to_vec())),
            Self::Ping(data) => Some(Frame::Ping(data.to_vec())),
            Self::Pong(data) => Some(Frame::Pong(data.to_vec())),
            Self::Close(frame) => Some(Frame::Close(
                frame.map(|f| CloseInfo::new(f.code, f.reason.as_str())),
            )),
        }
    }

    fn from_frame(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text.into()),
            Frame::Binary(data) => Self::Binary(data.into()),
            Frame::Ping(data) => Self::Ping(data.into()),
            Frame::Pong(data) => Self::Pong(data.into()),
            Frame::Close(info) => Self::Close(info.map(|info| axum_ws::CloseFrame {
                code: info.code,
                reason: info.reason.into(),
            })),
        }
    }
}

impl WireError for axum::Error {
    fn violation_code(&self) -> Option<u16> {
        // axum wraps the tungstenite error; anything else is a transport failure
        self.source()
            .and_then(|inner| inner.downcast_ref::<tungstenite::Error>())
            .and_then(WireError::violation_code)
    }
}
