//! Connect-mode settings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wsline_core::constants::{
    DEFAULT_CONTROL_PREFIX, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};

/// Settings for `--connect` sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// `Origin` header for the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// `Host` header override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Extra handshake headers (name → value).
    pub headers: BTreeMap<String, String>,
    /// Basic auth credentials as `user:pass`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Subprotocol to request; the server must accept it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    /// Skip TLS certificate verification.
    pub no_tls_check: bool,
    /// Interpret prefixed console lines as commands.
    pub slash_commands: bool,
    /// Control prefix used when `slash_commands` is on.
    pub control_prefix: char,
    /// Send this single line and exit after `wait_secs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute: Option<String>,
    /// How long a scripted session waits for replies.
    pub wait_secs: u64,
    /// Upper bound on the opening handshake.
    pub handshake_timeout_secs: u64,
    /// Deadline for every outbound frame.
    pub write_timeout_secs: u64,
    /// Surface ping/pong frames to the operator.
    pub show_control_frames: bool,
}

impl ClientSettings {
    /// Line for a scripted session. An empty `execute` means interactive.
    pub fn scripted_line(&self) -> Option<&str> {
        self.execute.as_deref().filter(|line| !line.is_empty())
    }

    /// Scripted wait as a [`Duration`].
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Write deadline as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            origin: None,
            host: None,
            headers: BTreeMap::new(),
            auth: None,
            subprotocol: None,
            no_tls_check: false,
            slash_commands: false,
            control_prefix: DEFAULT_CONTROL_PREFIX,
            execute: None,
            wait_secs: 2,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT.as_secs(),
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT.as_secs(),
            show_control_frames: false,
        }
    }
}
