//! Server error types.

use thiserror::Error;

/// Fatal listen-mode errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// Requested bind address.
        addr: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The bound listener could not report its address.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
    /// The route path is not usable.
    #[error("invalid route path \"{0}\": must start with '/'")]
    InvalidPath(String),
}
