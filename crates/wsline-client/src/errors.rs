//! Client error types.

use std::time::Duration;

use thiserror::Error;

/// Fatal startup errors on the connect path.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The URL could not be parsed at all.
    #[error("\"{0}\" is not a valid url")]
    InvalidUrl(String),
    /// The URL has no scheme.
    #[error("missing scheme in url: \"{0}\" to connect")]
    MissingScheme(String),
    /// The URL has no host.
    #[error("missing host in url: \"{0}\" to connect")]
    MissingHost(String),
    /// The scheme is not `ws`, `wss`, `http` or `https`.
    #[error("malformed scheme in url: \"{0}\" to connect")]
    MalformedScheme(String),
    /// A configured header name or value is not valid HTTP.
    #[error("invalid header \"{name}\": {reason}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The TLS client configuration could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(String),
    /// The opening handshake failed.
    #[error("connect to \"{url}\" failed with error: \"{reason}\"")]
    Handshake {
        /// Target URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },
    /// The opening handshake did not finish in time.
    #[error("connect to \"{url}\" timed out after {timeout:?}")]
    HandshakeTimeout {
        /// Target URL.
        url: String,
        /// Configured handshake bound.
        timeout: Duration,
    },
    /// A subprotocol was requested but the server did not select it.
    #[error("server sent no subprotocol (required \"{0}\")")]
    MissingSubprotocol(String),
}

/// Errors that end `run_client` before or outside a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connecting failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),
    /// The console could not be set up.
    #[error("setup read from console failed: {0}")]
    Console(#[from] std::io::Error),
}
