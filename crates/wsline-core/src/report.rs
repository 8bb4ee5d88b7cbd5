//! Operator-facing output.
//!
//! Components never print directly: they receive an `Arc<dyn Reporter>` at
//! construction time. `main` assembles one [`TerminalReporter`]; tests use
//! [`MemoryReporter`]. Diagnostics go through `tracing` instead.

use std::io::{IsTerminal, Write};

use crossterm::style::Stylize;
use parking_lot::Mutex;

use crate::message::{InboundMessage, MessageKind};

/// Output capability, one method per category of operator message.
pub trait Reporter: Send + Sync {
    /// Lifecycle notice (connected, listening, disconnected).
    fn ok(&self, message: &str);
    /// Something the operator should know went wrong.
    fn error(&self, message: &str);
    /// A frame received from the peer.
    fn received(&self, message: &InboundMessage);
}

/// Category of a reported line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportLevel {
    /// [`Reporter::ok`].
    Ok,
    /// [`Reporter::error`].
    Error,
    /// [`Reporter::received`].
    Received,
}

/// Writes colored lines to stdout.
#[derive(Debug)]
pub struct TerminalReporter {
    color: bool,
    line_ending: &'static str,
}

impl TerminalReporter {
    /// Create a reporter. `color = false` disables all styling.
    ///
    /// When stdout is a terminal, lines end in `\r\n` so output stays aligned
    /// while the console line editor holds the terminal in raw mode.
    pub fn new(color: bool) -> Self {
        let line_ending = if std::io::stdout().is_terminal() {
            "\r\n"
        } else {
            "\n"
        };
        Self { color, line_ending }
    }

    fn write_line(&self, text: &str, level: ReportLevel, kind: Option<MessageKind>) {
        let mut stdout = std::io::stdout().lock();
        let result = if self.color {
            let styled = match (level, kind) {
                (ReportLevel::Error, _) => text.yellow(),
                (ReportLevel::Received, Some(MessageKind::Text | MessageKind::Binary)) => {
                    text.blue()
                }
                _ => text.green(),
            };
            write!(stdout, "{styled}{}", self.line_ending)
        } else {
            write!(stdout, "{text}{}", self.line_ending)
        };
        if result.and_then(|()| stdout.flush()).is_err() {
            tracing::debug!("failed to write to stdout");
        }
    }
}

impl Reporter for TerminalReporter {
    fn ok(&self, message: &str) {
        self.write_line(message, ReportLevel::Ok, None);
    }

    fn error(&self, message: &str) {
        self.write_line(message, ReportLevel::Error, None);
    }

    fn received(&self, message: &InboundMessage) {
        self.write_line(&message.describe(), ReportLevel::Received, Some(message.kind));
    }
}

/// Records every reported line in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<(ReportLevel, String)>>,
}

impl MemoryReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines in order.
    pub fn lines(&self) -> Vec<(ReportLevel, String)> {
        self.lines.lock().clone()
    }

    /// Recorded lines at one level.
    pub fn at_level(&self, level: ReportLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Recorded error lines.
    pub fn errors(&self) -> Vec<String> {
        self.at_level(ReportLevel::Error)
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, text)| text.contains(needle))
    }

    fn push(&self, level: ReportLevel, text: String) {
        self.lines.lock().push((level, text));
    }
}

impl Reporter for MemoryReporter {
    fn ok(&self, message: &str) {
        self.push(ReportLevel::Ok, message.to_string());
    }

    fn error(&self, message: &str) {
        self.push(ReportLevel::Error, message.to_string());
    }

    fn received(&self, message: &InboundMessage) {
        self.push(ReportLevel::Received, message.describe());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.ok("Connected");
        reporter.received(&InboundMessage::text("hi"));
        reporter.error("bad");

        let lines = reporter.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (ReportLevel::Ok, "Connected".to_string()));
        assert_eq!(lines[1], (ReportLevel::Received, "< hi".to_string()));
        assert_eq!(lines[2], (ReportLevel::Error, "bad".to_string()));
    }

    #[test]
    fn memory_reporter_filters() {
        let reporter = MemoryReporter::new();
        reporter.error("one");
        reporter.ok("two");
        reporter.error("three");
        assert_eq!(reporter.errors(), vec!["one".to_string(), "three".to_string()]);
        assert!(reporter.contains("tw"));
        assert!(!reporter.contains("four"));
    }

    #[test]
    fn reporter_is_object_safe() {
        let reporter: Arc<dyn Reporter> = Arc::new(MemoryReporter::new());
        reporter.ok("works");
    }

    #[test]
    fn terminal_reporter_writes_without_color() {
        // Smoke test: writing must not panic regardless of stdout kind.
        let reporter = TerminalReporter::new(false);
        reporter.ok("ok line");
        reporter.received(&InboundMessage::binary(vec![1, 2, 3]));
    }
}
