//! Per-connection echo loop.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsline_channel::{
    ChannelOptions, Frame, FrameWriter, ReadFailure, WireError, WireMessage, open,
};
use wsline_core::{CloseInfo, MessageKind, Reporter};
use wsline_settings::ServerSettings;

/// Per-connection behavior.
#[derive(Clone, Copy, Debug)]
pub struct EchoOptions {
    /// Write text frames back to the sender.
    pub echo: bool,
    /// Surface ping/pong frames.
    pub show_control_frames: bool,
    /// Deadline for every echoed frame.
    pub write_timeout: Duration,
}

impl EchoOptions {
    /// Options derived from server settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            echo: settings.echo,
            show_control_frames: settings.show_control_frames,
            write_timeout: settings.write_timeout(),
        }
    }
}

/// What happened on one connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EchoSummary {
    /// Messages displayed.
    pub received: usize,
    /// Text frames written back.
    pub echoed: usize,
    /// The client's close frame, if one arrived.
    pub remote_close: Option<CloseInfo>,
}

/// Display inbound frames until the connection ends or `shutdown` fires.
///
/// The connection is always released best-effort on the way out: one close
/// frame is attempted and any failure is only logged. The status is normal
/// closure unless the client sent a malformed frame.
pub async fn run_echo<S, M, E>(
    socket: S,
    options: EchoOptions,
    reporter: Arc<dyn Reporter>,
    shutdown: &CancellationToken,
) -> EchoSummary
where
    S: Stream<Item = Result<M, E>> + Sink<M, Error = E> + Unpin + Send + 'static,
    M: WireMessage,
    E: WireError,
{
    let (sink, stream) = socket.split();
    let (mut inbound, mut reader) = open(
        stream,
        ChannelOptions {
            show_control_frames: options.show_control_frames,
        },
        reporter.clone(),
    );
    let mut writer = FrameWriter::new(sink, options.write_timeout);
    let mut summary = EchoSummary::default();

    loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => {
                debug!("server shutting down");
                break;
            }
            message = inbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        summary.received += 1;
        reporter.received(&message);

        if options.echo && message.kind == MessageKind::Text {
            if let Err(e) = writer.send(Frame::Text(message.text_lossy())).await {
                reporter.error(&format!("error: {e}"));
                break;
            }
            summary.echoed += 1;
        }
    }

    let status = match reader.failure() {
        Some(ReadFailure {
            violation: Some(code),
            message,
        }) => {
            reporter.error(&format!("invalid frame from client: {message}"));
            CloseInfo::new(code, "")
        }
        _ => CloseInfo::normal(),
    };
    if !writer.close_sent() {
        if let Err(e) = writer.send(Frame::Close(Some(status))).await {
            debug!(error = %e, "write close message failed");
        }
    }
    writer.release().await;
    reader.stop().await;

    summary.remote_close = reader.remote_close();
    summary
}
