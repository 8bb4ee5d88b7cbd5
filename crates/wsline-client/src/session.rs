//! Session orchestrator.
//!
//! One loop per session performs every write and every shutdown decision.
//! It selects over the interrupt token, inbound messages from the read loop,
//! and either console lines (interactive) or a deadline (scripted). Whatever
//! ends the loop goes through [`SessionState::begin_close`] before the
//! shutdown sequence runs.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsline_channel::{
    ChannelOptions, Frame, FrameWriter, ReaderHandle, WireError, WireMessage, open,
};
use wsline_core::constants::CLOSE_ACK_TIMEOUT;
use wsline_core::{CloseInfo, CommandParser, InboundMessage, Reporter};
use wsline_settings::ClientSettings;

use crate::console::ConsoleInput;
use crate::state::{CloseTrigger, SessionPhase, SessionState};

/// Per-session behavior.
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// Console line grammar.
    pub parser: CommandParser,
    /// Surface ping/pong frames.
    pub show_control_frames: bool,
    /// Deadline for every outbound frame.
    pub write_timeout: Duration,
}

impl SessionOptions {
    /// Options derived from client settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            parser: CommandParser::from_settings(settings.slash_commands, settings.control_prefix),
            show_control_frames: settings.show_control_frames,
            write_timeout: settings.write_timeout(),
        }
    }
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// The trigger that ended the session loop.
    pub trigger: CloseTrigger,
    /// Phase after shutdown (always [`SessionPhase::Closed`] on a clean run).
    pub phase: SessionPhase,
    /// The peer's close frame, if one arrived.
    pub remote_close: Option<CloseInfo>,
}

/// A connected session.
pub struct Session<S, M> {
    writer: FrameWriter<SplitSink<S, M>, M>,
    inbound: mpsc::Receiver<InboundMessage>,
    reader: ReaderHandle,
    parser: CommandParser,
    state: Arc<SessionState>,
    reporter: Arc<dyn Reporter>,
}

impl<S, M, E> Session<S, M>
where
    S: Stream<Item = Result<M, E>> + Sink<M, Error = E> + Unpin + Send + 'static,
    M: WireMessage,
    E: WireError,
{
    /// Split `socket` and start its read loop.
    pub fn new(socket: S, options: SessionOptions, reporter: Arc<dyn Reporter>) -> Self {
        let (sink, stream): (SplitSink<S, M>, SplitStream<S>) = socket.split();
        let (inbound, reader) = open(
            stream,
            ChannelOptions {
                show_control_frames: options.show_control_frames,
            },
            reporter.clone(),
        );
        Self {
            writer: FrameWriter::new(sink, options.write_timeout),
            inbound,
            reader,
            parser: options.parser,
            state: Arc::new(SessionState::new()),
            reporter,
        }
    }

    /// Send one line, then display replies until `wait` elapses.
    pub async fn run_scripted(
        mut self,
        line: &str,
        wait: Duration,
        interrupt: &CancellationToken,
    ) -> SessionOutcome {
        let trigger = match self.submit(line).await {
            Some(trigger) => trigger,
            None => self.wait_for_replies(wait, interrupt).await,
        };
        self.shutdown(trigger, None).await
    }

    /// Relay console lines and inbound messages until something ends the session.
    pub async fn run_interactive(
        mut self,
        mut console: ConsoleInput,
        interrupt: &CancellationToken,
    ) -> SessionOutcome {
        let trigger = loop {
            tokio::select! {
                () = interrupt.cancelled() => break CloseTrigger::Interrupt,
                line = console.recv() => match line {
                    None if console.interrupted() => break CloseTrigger::Interrupt,
                    None => break CloseTrigger::ConsoleClosed,
                    Some(line) if line.is_empty() => {}
                    Some(line) => {
                        if let Some(trigger) = self.submit(&line).await {
                            break trigger;
                        }
                    }
                },
                message = self.inbound.recv() => match message {
                    Some(message) => {
                        console.clear();
                        self.reporter.received(&message);
                        console.redraw();
                    }
                    None => break self.read_side_trigger(),
                },
            }
        };
        self.shutdown(trigger, Some(console)).await
    }

    /// End the session from outside the loops.
    pub async fn close(self, trigger: CloseTrigger) -> SessionOutcome {
        self.shutdown(trigger, None).await
    }

    /// Parse and send one line. Returns a trigger when the session must end.
    async fn submit(&mut self, line: &str) -> Option<CloseTrigger> {
        let command = match self.parser.parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.reporter.error(&e.to_string());
                return None;
            }
        };

        let name = command.name();
        let ends_session = command.ends_session();
        match self.writer.send_command(command).await {
            Ok(()) => {
                debug!(command = name, "frame sent");
                ends_session.then_some(CloseTrigger::CloseCommand)
            }
            Err(e) => {
                self.reporter.error(&format!("failed to send {name} frame: {e}"));
                Some(CloseTrigger::WriteFailed)
            }
        }
    }

    async fn wait_for_replies(
        &mut self,
        wait: Duration,
        interrupt: &CancellationToken,
    ) -> CloseTrigger {
        let deadline = tokio::time::sleep(wait);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = interrupt.cancelled() => return CloseTrigger::Interrupt,
                () = &mut deadline => return CloseTrigger::Timeout,
                message = self.inbound.recv() => match message {
                    Some(message) => self.reporter.received(&message),
                    None => return self.read_side_trigger(),
                },
            }
        }
    }

    /// Classify the end of the inbound channel.
    fn read_side_trigger(&self) -> CloseTrigger {
        if self.reader.received_close() {
            return CloseTrigger::RemoteClose;
        }
        match self.reader.failure() {
            Some(failure) if failure.violation.is_some() => {
                self.reporter
                    .error(&format!("invalid frame from server: {}", failure.message));
                CloseTrigger::ProtocolViolation
            }
            Some(failure) => {
                self.reporter
                    .error(&format!("connection lost: {}", failure.message));
                CloseTrigger::ConnectionLost
            }
            None => {
                self.reporter.error("connection lost");
                CloseTrigger::ConnectionLost
            }
        }
    }

    async fn shutdown(
        mut self,
        trigger: CloseTrigger,
        console: Option<ConsoleInput>,
    ) -> SessionOutcome {
        if self.state.begin_close(trigger) {
            debug!(?trigger, "session closing");
        } else {
            debug!(?trigger, phase = ?self.state.phase(), "close already in progress");
        }
        // the phase decides, whoever moved it out of Active
        if self.state.phase() == SessionPhase::ClosingLocal && trigger != CloseTrigger::WriteFailed
        {
            self.notify_peer().await;
        }

        self.writer.release().await;
        self.reader.stop().await;
        if let Some(mut console) = console {
            console.close().await;
        }
        if !self.state.finish() {
            debug!("session already finished");
        }

        SessionOutcome {
            trigger,
            phase: self.state.phase(),
            remote_close: self.reader.remote_close(),
        }
    }

    /// Send our close frame unless one already went out, then give the peer
    /// a bounded window to answer with its own.
    async fn notify_peer(&mut self) {
        if !self.writer.close_sent() && !self.reader.received_close() {
            let status = self.close_status();
            if let Err(e) = self.writer.send(Frame::Close(Some(status))).await {
                debug!(error = %e, "write close message failed");
                return;
            }
        }
        if self.reader.received_close() {
            return;
        }

        let inbound = &mut self.inbound;
        let drain = async move {
            while let Some(message) = inbound.recv().await {
                debug!(kind = ?message.kind, "discarding message during close");
            }
        };
        if tokio::time::timeout(CLOSE_ACK_TIMEOUT, drain).await.is_err() {
            debug!("peer did not answer close in time");
        }
    }

    /// Normal closure, or the violation status when a bad frame ended the read loop.
    fn close_status(&self) -> CloseInfo {
        self.reader
            .failure()
            .and_then(|failure| failure.violation)
            .map_or_else(CloseInfo::normal, |code| CloseInfo::new(code, ""))
    }
}
