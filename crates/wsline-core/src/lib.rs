//! # wsline-core
//!
//! Shared vocabulary for the wsline client and echo server.
//!
//! - **Messages**: [`InboundMessage`] produced by the read loop, [`OutboundCommand`] consumed by the
//!   write path, [`CloseInfo`] for close frames
//! - **Commands**: [`CommandParser`] turns one console line into an [`OutboundCommand`]
//! - **Reporter**: the operator-facing output capability, injected into every component that
//!   prints something for the user
//! - **Logging**: `tracing` subscriber setup for diagnostics
//! - **Shutdown**: [`ShutdownCoordinator`] wiring process interrupts into cancellation tokens

#![deny(unsafe_code)]

pub mod command;
pub mod constants;
pub mod logging;
pub mod message;
pub mod report;
pub mod shutdown;

pub use command::{CommandError, CommandParser};
pub use message::{CloseInfo, InboundMessage, MessageKind, OutboundCommand};
pub use report::{MemoryReporter, ReportLevel, Reporter, TerminalReporter};
pub use shutdown::ShutdownCoordinator;
