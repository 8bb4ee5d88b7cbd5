//! # wsline-server
//!
//! The `--listen` side of wsline.
//!
//! - **Server**: [`EchoServer`] mounts a single WebSocket route on an axum router and
//!   serves it until the shutdown token fires
//! - **Echo**: [`run_echo`] displays every frame a client sends and, when enabled,
//!   writes text frames straight back

#![deny(unsafe_code)]

pub mod echo;
pub mod errors;
pub mod server;

pub use echo::{EchoOptions, EchoSummary, run_echo};
pub use errors::ServerError;
pub use server::EchoServer;
