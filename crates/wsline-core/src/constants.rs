//! Package-level constants.

use std::time::Duration;

/// Version reported by `--version` (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name shown in usage and help.
pub const NAME: &str = "wsline";

/// Upper bound on the opening handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline applied to every outbound frame.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long shutdown waits for the peer to answer our close frame.
pub const CLOSE_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Status code sent when the session ends without an explicit `/close`.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Status code reported when a close frame carries no payload.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Status sent when the peer breaks the framing rules.
pub const PROTOCOL_ERROR: u16 = 1002;

/// Status sent when a text frame is not valid UTF-8.
pub const INVALID_PAYLOAD: u16 = 1007;

/// Status sent when an inbound message exceeds the size limits.
pub const MESSAGE_TOO_BIG: u16 = 1009;

/// Default control prefix for console commands.
pub const DEFAULT_CONTROL_PREFIX: char = '/';

/// Prompt drawn in front of the console edit line.
pub const PROMPT: &str = "> ";
