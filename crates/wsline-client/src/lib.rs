//! # wsline-client
//!
//! The `--connect` side of wsline.
//!
//! - **Connect**: [`parse_connect_url`], [`build_request`], rustls configuration and the
//!   bounded opening handshake
//! - **Console**: [`ConsoleInput`] over a raw-mode terminal editor or any buffered reader
//! - **Session**: [`Session`] runs scripted or interactive mode and owns the one-shot
//!   shutdown sequence guarded by [`SessionState`]

#![deny(unsafe_code)]

pub mod client;
pub mod connect;
pub mod console;
pub mod errors;
pub mod session;
pub mod state;
pub mod tls;

pub use client::run_client;
pub use connect::{ClientStream, build_request, check_subprotocol, connect, parse_connect_url};
pub use console::{
    ConsoleInput, LineSource, PlainDisplay, PromptDisplay, ReaderSource, TerminalSource,
};
pub use errors::{ConnectError, SessionError};
pub use session::{Session, SessionOptions, SessionOutcome};
pub use state::{CloseTrigger, SessionPhase, SessionState};
