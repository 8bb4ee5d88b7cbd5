//! Console input source.
//!
//! A [`LineSource`] produces one line at a time; [`ConsoleInput`] runs it on
//! a single task and publishes each line over a channel. Cancellation races
//! a [`CancellationToken`] against the pending read, so a parked read is
//! dropped immediately instead of being polled.
//!
//! Two sources exist: [`TerminalSource`] (raw-mode line editor on a TTY) and
//! [`ReaderSource`] (any `AsyncBufRead`, used for piped stdin and tests).

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::cursor::MoveToColumn;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wsline_core::constants::PROMPT;

/// How long [`ConsoleInput::close`] waits for the reader task.
const CONSOLE_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Something that yields lines of operator input.
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator. `Ok(None)` means end of input; an
    /// error of kind [`io::ErrorKind::Interrupted`] means the operator
    /// pressed Ctrl-C.
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Erases and restores the unfinished input line around printed output.
pub trait PromptDisplay: Send + Sync {
    /// Erase the current input line.
    fn clear(&self);
    /// Redraw the prompt and whatever was typed so far.
    fn redraw(&self);
}

/// Display for non-interactive sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainDisplay;

impl PromptDisplay for PlainDisplay {
    fn clear(&self) {}
    fn redraw(&self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleInput
// ─────────────────────────────────────────────────────────────────────────────

/// A running console reader.
pub struct ConsoleInput {
    lines: mpsc::Receiver<String>,
    display: Arc<dyn PromptDisplay>,
    cancel: CancellationToken,
    done: CancellationToken,
    interrupted: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ConsoleInput {
    /// Spawn exactly one reader task over `source`.
    pub fn start<S>(source: S, display: Arc<dyn PromptDisplay>) -> Self
    where
        S: LineSource + 'static,
    {
        let (tx, lines) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let interrupted = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(read_lines(
            source,
            tx,
            cancel.clone(),
            done.clone(),
            interrupted.clone(),
        ));

        Self {
            lines,
            display,
            cancel,
            done,
            interrupted,
            task: Some(task),
        }
    }

    /// Next line, or `None` once the source has ended.
    pub async fn recv(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Resolves once the reader task has exited.
    pub async fn done(&self) {
        self.done.cancelled().await;
    }

    /// Whether the source ended because the operator pressed Ctrl-C.
    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Unblock the pending read and stop the reader.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Erase the unfinished input line.
    pub fn clear(&self) {
        self.display.clear();
    }

    /// Restore the prompt and the unfinished input line.
    pub fn redraw(&self) {
        self.display.redraw();
    }

    /// Cancel and wait (bounded) for the reader task, releasing the source.
    pub async fn close(&mut self) {
        self.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        match tokio::time::timeout(CONSOLE_CLOSE_TIMEOUT, task).await {
            Err(_) => debug!("console reader did not exit in time"),
            Ok(Err(e)) => debug!(error = %e, "console reader task failed"),
            Ok(Ok(())) => {}
        }
    }
}

impl Drop for ConsoleInput {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_lines<S: LineSource>(
    mut source: S,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    done: CancellationToken,
    interrupted: Arc<AtomicBool>,
) {
    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = source.read_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let sent = tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = tx.send(line) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("console input ended");
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("console interrupted");
                interrupted.store(true, Ordering::Release);
                break;
            }
            Err(e) => {
                debug!(error = %e, "receive error when read from console");
                break;
            }
        }
    }
    // Dropping the source restores the terminal before anyone observes `done`.
    drop(source);
    done.cancel();
}

// ─────────────────────────────────────────────────────────────────────────────
// ReaderSource
// ─────────────────────────────────────────────────────────────────────────────

/// Lines from any buffered async reader.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R> ReaderSource<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> LineSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            let _ = line.pop();
            if line.ends_with('\r') {
                let _ = line.pop();
            }
        }
        Ok(Some(line))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TerminalSource
// ─────────────────────────────────────────────────────────────────────────────

/// Restores cooked mode on drop.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            debug!(error = %e, "failed to restore terminal mode");
        }
    }
}

/// Prompt renderer sharing the edit buffer with [`TerminalSource`].
#[derive(Clone, Default)]
pub struct TerminalPrompt {
    buffer: Arc<Mutex<String>>,
}

impl TerminalPrompt {
    fn draw(&self, out: &mut impl Write) -> io::Result<()> {
        let buffer = self.buffer.lock();
        queue!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(PROMPT),
            Print(buffer.as_str())
        )?;
        out.flush()
    }
}

impl PromptDisplay for TerminalPrompt {
    fn clear(&self) {
        let mut out = io::stdout();
        if let Err(e) = execute!(out, MoveToColumn(0), Clear(ClearType::CurrentLine)) {
            debug!(error = %e, "failed to clear prompt");
        }
    }

    fn redraw(&self) {
        if let Err(e) = self.draw(&mut io::stdout()) {
            debug!(error = %e, "failed to redraw prompt");
        }
    }
}

/// What a key press does to the edit line.
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Submit(String),
    Redraw,
    Echo(char),
    EndOfInput,
    Interrupt,
    Ignore,
}

/// Raw-mode line editor over crossterm's async event stream.
pub struct TerminalSource {
    events: EventStream,
    prompt: TerminalPrompt,
    _raw: RawModeGuard,
}

impl TerminalSource {
    /// Put the terminal in raw mode and draw the first prompt.
    pub fn new() -> io::Result<(Self, TerminalPrompt)> {
        let raw = RawModeGuard::enable()?;
        let prompt = TerminalPrompt::default();
        prompt.draw(&mut io::stdout())?;
        let source = Self {
            events: EventStream::new(),
            prompt: prompt.clone(),
            _raw: raw,
        };
        Ok((source, prompt))
    }
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => KeyAction::Interrupt,
        KeyCode::Char('d') if ctrl => {
            if buffer.is_empty() {
                KeyAction::EndOfInput
            } else {
                KeyAction::Ignore
            }
        }
        KeyCode::Char('u') if ctrl => {
            buffer.clear();
            KeyAction::Redraw
        }
        KeyCode::Enter => KeyAction::Submit(std::mem::take(buffer)),
        KeyCode::Backspace => {
            if buffer.pop().is_some() {
                KeyAction::Redraw
            } else {
                KeyAction::Ignore
            }
        }
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            buffer.push(c);
            KeyAction::Echo(c)
        }
        _ => KeyAction::Ignore,
    }
}

#[async_trait]
impl LineSource for TerminalSource {
    async fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(event) = self.events.next().await else {
                return Ok(None);
            };
            let Event::Key(key) = event? else {
                continue;
            };

            let action = apply_key(&mut self.prompt.buffer.lock(), key);
            let mut out = io::stdout();
            match action {
                KeyAction::Submit(line) => {
                    queue!(out, Print("\r\n"))?;
                    self.prompt.draw(&mut out)?;
                    return Ok(Some(line));
                }
                KeyAction::Redraw => self.prompt.draw(&mut out)?,
                KeyAction::Echo(c) => {
                    queue!(out, Print(c))?;
                    out.flush()?;
                }
                KeyAction::EndOfInput => {
                    queue!(out, Print("\r\n"))?;
                    out.flush()?;
                    return Ok(None);
                }
                KeyAction::Interrupt => {
                    queue!(out, Print("^C\r\n"))?;
                    out.flush()?;
                    return Err(io::Error::from(io::ErrorKind::Interrupted));
                }
                KeyAction::Ignore => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedSource {
        items: VecDeque<io::Result<Option<String>>>,
    }

    #[async_trait]
    impl LineSource for ScriptedSource {
        async fn read_line(&mut self) -> io::Result<Option<String>> {
            match self.items.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }
    }

    fn plain() -> Arc<dyn PromptDisplay> {
        Arc::new(PlainDisplay)
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[tokio::test]
    async fn reader_source_strips_terminators() {
        let input: &[u8] = b"one\ntwo\r\nthree";
        let mut console = ConsoleInput::start(ReaderSource::new(input), plain());

        assert_eq!(console.recv().await.as_deref(), Some("one"));
        assert_eq!(console.recv().await.as_deref(), Some("two"));
        assert_eq!(console.recv().await.as_deref(), Some("three"));
        assert_eq!(console.recv().await, None);
        console.done().await;
        assert!(!console.interrupted());
    }

    #[tokio::test]
    async fn empty_lines_are_published() {
        let input: &[u8] = b"\n\nx\n";
        let mut console = ConsoleInput::start(ReaderSource::new(input), plain());
        assert_eq!(console.recv().await.as_deref(), Some(""));
        assert_eq!(console.recv().await.as_deref(), Some(""));
        assert_eq!(console.recv().await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn cancel_unblocks_pending_read() {
        let source = ScriptedSource {
            items: VecDeque::new(),
        };
        let mut console = ConsoleInput::start(source, plain());

        console.cancel();
        tokio::time::timeout(Duration::from_secs(1), console.done())
            .await
            .expect("cancel should unblock the reader");
        assert_eq!(console.recv().await, None);
        console.close().await;
    }

    #[tokio::test]
    async fn interrupt_is_recorded() {
        let source = ScriptedSource {
            items: VecDeque::from([
                Ok(Some("first".to_string())),
                Err(io::Error::from(io::ErrorKind::Interrupted)),
            ]),
        };
        let mut console = ConsoleInput::start(source, plain());

        assert_eq!(console.recv().await.as_deref(), Some("first"));
        assert_eq!(console.recv().await, None);
        assert!(console.interrupted());
    }

    #[tokio::test]
    async fn read_error_ends_source() {
        let source = ScriptedSource {
            items: VecDeque::from([Err(io::Error::other("tty gone"))]),
        };
        let mut console = ConsoleInput::start(source, plain());

        assert_eq!(console.recv().await, None);
        assert!(!console.interrupted());
    }

    #[test]
    fn line_editing_keys() {
        let mut buffer = String::new();
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('h'), KeyModifiers::NONE)),
            KeyAction::Echo('h')
        );
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('I'), KeyModifiers::SHIFT)),
            KeyAction::Echo('I')
        );
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Backspace, KeyModifiers::NONE)),
            KeyAction::Redraw
        );
        assert_eq!(buffer, "h");
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Enter, KeyModifiers::NONE)),
            KeyAction::Submit("h".into())
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn control_keys() {
        let mut buffer = String::from("abc");
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            KeyAction::Ignore
        );
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('u'), KeyModifiers::CONTROL)),
            KeyAction::Redraw
        );
        assert!(buffer.is_empty());
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            KeyAction::EndOfInput
        );
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Interrupt
        );
        assert_eq!(
            apply_key(&mut buffer, press(KeyCode::Backspace, KeyModifiers::NONE)),
            KeyAction::Ignore
        );
    }

    #[test]
    fn key_release_is_ignored() {
        let mut buffer = String::new();
        let mut key = press(KeyCode::Char('x'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(apply_key(&mut buffer, key), KeyAction::Ignore);
        assert!(buffer.is_empty());
    }
}
