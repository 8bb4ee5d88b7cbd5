//! # wsline-channel
//!
//! Adapter between a WebSocket connection and the rest of wsline.
//!
//! - **Frames**: [`Frame`] is the library-neutral frame model; [`WireMessage`] converts
//!   `tungstenite` and `axum` messages to and from it
//! - **Reader**: [`open`] spawns the read loop and hands back a capacity-1 channel of
//!   [`InboundMessage`](wsline_core::InboundMessage)s plus a [`ReaderHandle`]
//! - **Writer**: [`FrameWriter`] sends one frame at a time, each bounded by a deadline
//!
//! The same code serves the client (`tokio-tungstenite` streams) and the echo
//! server (`axum` sockets).

#![deny(unsafe_code)]

pub mod errors;
pub mod frame;
pub mod reader;
pub mod writer;

pub use errors::ChannelError;
pub use frame::{Frame, WireError, WireMessage};
pub use reader::{ChannelOptions, ReadFailure, ReaderHandle, open};
pub use writer::FrameWriter;
