//! Diagnostic logging with `tracing`.
//!
//! Operator output goes through [`crate::Reporter`]; everything here is for
//! debugging the tool itself and is written to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `--debug` is not given.
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter used with `--debug`.
pub const DEBUG_LEVEL: &str = "debug";

/// Pick the filter string for the given debug flag.
pub fn level_for(debug: bool) -> &'static str {
    if debug { DEBUG_LEVEL } else { DEFAULT_LEVEL }
}

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at startup. Subsequent calls are no-ops. `RUST_LOG` takes
/// precedence over `level`.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails if a subscriber is already installed
    let _ = subscriber.try_init();
}
