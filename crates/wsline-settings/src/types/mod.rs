//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` on disk and implement
//! [`Default`]. Every struct is `#[serde(default)]` so partial JSON works.

mod client;
mod output;
mod server;

pub use client::*;
pub use output::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "client": { "waitSecs": 5, "slashCommands": true },
///   "server": { "echo": true },
///   "output": { "color": false }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WslineSettings {
    /// Connect-mode settings.
    pub client: ClientSettings,
    /// Listen-mode settings.
    pub server: ServerSettings,
    /// Operator output settings.
    pub output: OutputSettings,
}

impl WslineSettings {
    /// Reject values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.client.control_prefix.is_whitespace() {
            return Err(SettingsError::InvalidValue(
                "client.controlPrefix must not be whitespace".into(),
            ));
        }
        if self.client.handshake_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "client.handshakeTimeoutSecs must be at least 1".into(),
            ));
        }
        if self.client.write_timeout_secs == 0 || self.server.write_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "writeTimeoutSecs must be at least 1".into(),
            ));
        }
        if !self.server.path.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "server.path must start with '/': {}",
                self.server.path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn serde_roundtrip() {
        let settings = WslineSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: WslineSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn json_field_names_are_camel_case() {
        let json = serde_json::to_value(WslineSettings::default()).unwrap();
        assert!(json["client"].get("waitSecs").is_some());
        assert!(json["client"].get("noTlsCheck").is_some());
        assert!(json["client"].get("controlPrefix").is_some());
        assert!(json["server"].get("showControlFrames").is_some());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: WslineSettings =
            serde_json::from_str(r#"{"client": {"waitSecs": 9}}"#).unwrap();
        assert_eq!(settings.client.wait_secs, 9);
        assert_eq!(settings.client.write_timeout_secs, 5);
        assert_eq!(settings.server, ServerSettings::default());
    }

    #[test]
    fn validate_rejects_whitespace_prefix() {
        let mut settings = WslineSettings::default();
        settings.client.control_prefix = ' ';
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_relative_path() {
        let mut settings = WslineSettings::default();
        settings.server.path = "ws".into();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(m)) if m.contains("ws"));
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut settings = WslineSettings::default();
        settings.client.handshake_timeout_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = WslineSettings::default();
        settings.server.write_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }
}
