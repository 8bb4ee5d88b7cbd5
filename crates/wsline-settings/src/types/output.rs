//! Operator output settings.

use serde::{Deserialize, Serialize};

/// How wsline talks to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputSettings {
    /// Colorize terminal output.
    pub color: bool,
    /// Emit debug diagnostics on stderr.
    pub debug: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            color: true,
            debug: false,
        }
    }
}
