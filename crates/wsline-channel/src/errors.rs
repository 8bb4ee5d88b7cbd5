//! Channel error types.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the write path.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The frame was not handed to the transport before the deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
    /// The transport rejected the frame.
    #[error("write failed: {0}")]
    Write(String),
}
