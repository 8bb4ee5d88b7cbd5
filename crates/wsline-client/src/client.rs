//! Client entry point: connect, pick a console, run the session.

use std::io::IsTerminal;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wsline_core::Reporter;
use wsline_settings::ClientSettings;

use crate::connect::{connect, parse_connect_url};
use crate::console::{ConsoleInput, PlainDisplay, ReaderSource, TerminalSource};
use crate::errors::SessionError;
use crate::session::{Session, SessionOptions, SessionOutcome};
use crate::state::CloseTrigger;

/// Connect to `target` and run one session to completion.
///
/// With a non-empty `settings.execute` the session is scripted; otherwise
/// lines are read from the terminal (or from piped stdin).
pub async fn run_client(
    target: &str,
    settings: &ClientSettings,
    reporter: Arc<dyn Reporter>,
    interrupt: CancellationToken,
) -> Result<SessionOutcome, SessionError> {
    let url = parse_connect_url(target)?;
    let (stream, _response) = connect(&url, settings).await?;
    info!(%url, "connected");
    reporter.ok("Connected (press CTRL+C to quit)");

    let session = Session::new(stream, SessionOptions::from_settings(settings), reporter);

    let outcome = if let Some(line) = settings.scripted_line() {
        session.run_scripted(line, settings.wait(), &interrupt).await
    } else {
        match open_console() {
            Ok(console) => session.run_interactive(console, &interrupt).await,
            Err(e) => {
                let _ = session.close(CloseTrigger::ConsoleClosed).await;
                return Err(SessionError::Console(e));
            }
        }
    };

    info!(trigger = ?outcome.trigger, "session ended");
    Ok(outcome)
}

/// Line editor on a terminal, plain line reader otherwise.
fn open_console() -> std::io::Result<ConsoleInput> {
    if std::io::stdin().is_terminal() {
        let (source, prompt) = TerminalSource::new()?;
        Ok(ConsoleInput::start(source, Arc::new(prompt)))
    } else {
        let source = ReaderSource::new(BufReader::new(tokio::io::stdin()));
        Ok(ConsoleInput::start(source, Arc::new(PlainDisplay)))
    }
}
