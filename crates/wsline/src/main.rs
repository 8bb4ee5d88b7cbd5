//! # wsline
//!
//! Binary entry point: parses flags, layers them over the settings file and
//! environment, then runs either a client session or the echo server.

#![deny(unsafe_code)]

mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use wsline_core::logging::{init_subscriber, level_for};
use wsline_core::{Reporter, ShutdownCoordinator, TerminalReporter};
use wsline_settings::WslineSettings;

use crate::cli::Cli;

/// Time allowed for stray blocking work (a pending stdin read) after the session ends.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            TerminalReporter::new(!cli.no_color).error(&format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    init_subscriber(level_for(settings.output.debug));
    let reporter: Arc<dyn Reporter> = Arc::new(TerminalReporter::new(settings.output.color));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            reporter.error(&format!("failed to start runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(&cli, &settings, reporter.clone()));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Settings file (or `--config`), then environment, then flags.
fn resolve_settings(cli: &Cli) -> Result<WslineSettings> {
    let mut settings = match &cli.config {
        Some(path) => wsline_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => wsline_settings::load_settings().context("failed to load settings")?,
    };
    cli.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

async fn run(cli: &Cli, settings: &WslineSettings, reporter: Arc<dyn Reporter>) -> Result<()> {
    let shutdown = ShutdownCoordinator::new();
    let interrupt_listener = shutdown.listen_for_interrupt();

    let result = if let Some(target) = &cli.connect {
        match wsline_client::run_client(target, &settings.client, reporter, shutdown.token()).await
        {
            Ok(outcome) => {
                tracing::debug!(trigger = ?outcome.trigger, "client finished");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    } else {
        let server = wsline_server::EchoServer::new(settings.server.clone(), reporter);
        server
            .serve(shutdown.token())
            .await
            .map_err(anyhow::Error::from)
    };

    shutdown
        .graceful_shutdown(vec![interrupt_listener], None)
        .await;
    result
}
