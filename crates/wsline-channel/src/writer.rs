//! Deadline-bounded write path.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use futures::{Sink, SinkExt};
use tracing::debug;
use wsline_core::OutboundCommand;

use crate::errors::ChannelError;
use crate::frame::{Frame, WireMessage};

/// Sends frames on the write half of a connection.
///
/// Every send is bounded by the configured deadline. Only one task owns the
/// writer, so frames never interleave.
pub struct FrameWriter<K, M> {
    sink: K,
    timeout: Duration,
    close_sent: bool,
    _message: PhantomData<fn(M)>,
}

impl<K, M> fmt::Debug for FrameWriter<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWriter")
            .field("timeout", &self.timeout)
            .field("close_sent", &self.close_sent)
            .finish_non_exhaustive()
    }
}

impl<K, M, E> FrameWriter<K, M>
where
    K: Sink<M, Error = E> + Unpin,
    M: WireMessage,
    E: fmt::Display,
{
    /// Wrap a sink with a per-frame deadline.
    pub fn new(sink: K, timeout: Duration) -> Self {
        Self {
            sink,
            timeout,
            close_sent: false,
            _message: PhantomData,
        }
    }

    /// Send one frame within the deadline.
    pub async fn send(&mut self, frame: Frame) -> Result<(), ChannelError> {
        let is_close = matches!(frame, Frame::Close(_));
        match tokio::time::timeout(self.timeout, self.sink.send(M::from_frame(frame))).await {
            Err(_) => Err(ChannelError::WriteTimeout(self.timeout)),
            Ok(Err(e)) => Err(ChannelError::Write(e.to_string())),
            Ok(Ok(())) => {
                if is_close {
                    self.close_sent = true;
                }
                Ok(())
            }
        }
    }

    /// Send the frame for a parsed console command.
    pub async fn send_command(&mut self, command: OutboundCommand) -> Result<(), ChannelError> {
        self.send(Frame::from(command)).await
    }

    /// Whether a close frame has been written.
    pub fn close_sent(&self) -> bool {
        self.close_sent
    }

    /// Flush and close the sink, bounded by the deadline. Failures are logged.
    pub async fn release(&mut self) {
        match tokio::time::timeout(self.timeout, self.sink.close()).await {
            Err(_) => debug!(timeout = ?self.timeout, "release timed out"),
            Ok(Err(e)) => debug!(error = %e, "release failed"),
            Ok(Ok(())) => debug!("write half released"),
        }
    }
}
