//! Listen-mode settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wsline_core::constants::DEFAULT_WRITE_TIMEOUT;

/// Settings for `--listen` mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 picks an ephemeral port).
    pub port: u16,
    /// Route the upgrade endpoint is mounted at.
    pub path: String,
    /// Echo text frames back to the sender.
    pub echo: bool,
    /// Subprotocol clients must negotiate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
    /// Surface ping/pong frames to the operator.
    pub show_control_frames: bool,
    /// Deadline for every echoed frame.
    pub write_timeout_secs: u64,
}

impl ServerSettings {
    /// `host:port` suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Write deadline as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            path: "/".to_string(),
            echo: false,
            subprotocol: None,
            show_control_frames: false,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT.as_secs(),
        }
    }
}
