//! # wsline-settings
//!
//! Layered configuration for the wsline client and echo server.
//!
//! Settings are resolved from four layers (lowest priority first):
//! 1. **Compiled defaults**: [`WslineSettings::default()`]
//! 2. **User file**: `~/.wsline/settings.json` or `--config <path>` (deep-merged over defaults)
//! 3. **Environment variables**: `WSLINE_*` and `NO_COLOR`
//! 4. **Command-line flags**: applied by the binary after loading

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_with, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = WslineSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = WslineSettings::default();
        assert_eq!(settings.client.wait_secs, 2);
        assert_eq!(settings.client.handshake_timeout_secs, 5);
        assert_eq!(settings.client.control_prefix, '/');
        assert!(!settings.client.slash_commands);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.path, "/");
        assert!(settings.output.color);
        assert!(settings.validate().is_ok());
    }
}
