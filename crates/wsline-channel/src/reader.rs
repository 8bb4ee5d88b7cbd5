//! Read loop.
//!
//! One task per connection pulls frames off the read half and forwards
//! application messages over a channel of capacity 1, so a slow consumer
//! stalls the reader instead of buffering without bound. Ping replies are
//! produced by the WebSocket library while the stream is polled.
//!
//! A read error always ends the loop; the error is kept on the handle so the
//! owner can tell a malformed frame from a dropped connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use wsline_core::constants::NO_STATUS_RECEIVED;
use wsline_core::{CloseInfo, InboundMessage, Reporter};

use crate::frame::{Frame, WireError, WireMessage};

/// Read loop options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelOptions {
    /// Forward ping/pong frames to the consumer.
    pub show_control_frames: bool,
}

/// The read error that ended the loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadFailure {
    /// Close status owed to the peer when it broke the protocol.
    pub violation: Option<u16>,
    /// The error as displayed by the WebSocket library.
    pub message: String,
}

#[derive(Debug, Default)]
struct Shared {
    received_close: AtomicBool,
    remote_close: Mutex<Option<CloseInfo>>,
    failure: Mutex<Option<ReadFailure>>,
}

/// Handle to a running read loop.
#[derive(Debug)]
pub struct ReaderHandle {
    cancel: CancellationToken,
    done: CancellationToken,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Resolves once the read loop has exited for any reason.
    pub async fn done(&self) {
        self.done.cancelled().await;
    }

    /// Whether the read loop has exited.
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Close frame received from the peer, if any.
    pub fn remote_close(&self) -> Option<CloseInfo> {
        self.shared.remote_close.lock().clone()
    }

    /// Whether the peer sent a close frame.
    pub fn received_close(&self) -> bool {
        self.shared.received_close.load(Ordering::Acquire)
    }

    /// The read error that ended the loop, if one did.
    pub fn failure(&self) -> Option<ReadFailure> {
        self.shared.failure.lock().clone()
    }

    /// Stop the read loop and wait for it to exit. Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "read loop task failed");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn the read loop over `stream`.
///
/// Returns the inbound channel (closed when the loop exits) and a handle for
/// observing or stopping the loop.
pub fn open<St, M, E>(
    stream: St,
    options: ChannelOptions,
    reporter: Arc<dyn Reporter>,
) -> (mpsc::Receiver<InboundMessage>, ReaderHandle)
where
    St: Stream<Item = Result<M, E>> + Unpin + Send + 'static,
    M: WireMessage,
    E: WireError,
{
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let done = CancellationToken::new();
    let shared = Arc::new(Shared::default());

    let read_loop = ReadLoop {
        tx,
        options,
        reporter,
        shared: shared.clone(),
        cancel: cancel.clone(),
    };
    let done_signal = done.clone();
    let task = tokio::spawn(async move {
        read_loop.run(stream).await;
        done_signal.cancel();
    });

    let handle = ReaderHandle {
        cancel,
        done,
        shared,
        task: Some(task),
    };
    (rx, handle)
}

struct ReadLoop {
    tx: mpsc::Sender<InboundMessage>,
    options: ChannelOptions,
    reporter: Arc<dyn Reporter>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl ReadLoop {
    async fn run<St, M, E>(self, mut stream: St)
    where
        St: Stream<Item = Result<M, E>> + Unpin,
        M: WireMessage,
        E: WireError,
    {
        loop {
            let next = tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("read loop stopped locally");
                    break;
                }
                next = stream.next() => next,
            };

            let message = match next {
                None => {
                    debug!("connection stream ended");
                    break;
                }
                Some(Err(e)) => {
                    let violation = e.violation_code();
                    debug!(error = %e, ?violation, "read failed");
                    *self.shared.failure.lock() = Some(ReadFailure {
                        violation,
                        message: e.to_string(),
                    });
                    break;
                }
                Some(Ok(message)) => message,
            };

            let inbound = match message.into_frame() {
                None => continue,
                Some(Frame::Text(text)) => InboundMessage::text(text),
                Some(Frame::Binary(data)) => InboundMessage::binary(data),
                Some(Frame::Ping(data)) => {
                    trace!(len = data.len(), "ping received");
                    if !self.options.show_control_frames {
                        continue;
                    }
                    InboundMessage::ping(data)
                }
                Some(Frame::Pong(data)) => {
                    trace!(len = data.len(), "pong received");
                    if !self.options.show_control_frames {
                        continue;
                    }
                    InboundMessage::pong(data)
                }
                Some(Frame::Close(info)) => {
                    let info = info.unwrap_or_else(|| CloseInfo::new(NO_STATUS_RECEIVED, ""));
                    self.reporter.ok(&format!("Disconnected ({info})"));
                    *self.shared.remote_close.lock() = Some(info);
                    self.shared.received_close.store(true, Ordering::Release);
                    break;
                }
            };

            if !self.deliver(inbound).await {
                break;
            }
        }
    }

    /// Hand one message to the consumer. `false` ends the loop.
    async fn deliver(&self, message: InboundMessage) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(message) => {
                if sent.is_err() {
                    debug!("inbound receiver dropped");
                }
                sent.is_ok()
            }
        }
    }
}
