//! `EchoServer`: axum router with a single WebSocket route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures::SinkExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;
use wsline_core::Reporter;
use wsline_core::constants::NORMAL_CLOSURE;
use wsline_settings::ServerSettings;

use crate::echo::{EchoOptions, run_echo};
use crate::errors::ServerError;

/// Shared state for the upgrade handler.
#[derive(Clone)]
struct EchoState {
    subprotocol: Option<String>,
    options: EchoOptions,
    reporter: Arc<dyn Reporter>,
    shutdown: CancellationToken,
}

/// The listen-mode server.
pub struct EchoServer {
    settings: ServerSettings,
    reporter: Arc<dyn Reporter>,
}

impl EchoServer {
    /// Create a server for `settings`.
    pub fn new(settings: ServerSettings, reporter: Arc<dyn Reporter>) -> Self {
        Self { settings, reporter }
    }

    /// Build the router. Open connections end when `shutdown` fires.
    pub fn router(&self, shutdown: CancellationToken) -> Result<Router, ServerError> {
        let path = self.settings.path.as_str();
        if !path.starts_with('/') {
            return Err(ServerError::InvalidPath(path.to_string()));
        }

        let state = EchoState {
            subprotocol: self.settings.subprotocol.clone(),
            options: EchoOptions::from_settings(&self.settings),
            reporter: self.reporter.clone(),
            shutdown,
        };

        Ok(Router::new()
            .route(path, get(ws_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http()))
    }

    /// Bind and start serving in the background.
    ///
    /// Returns the bound address and the serve task, which finishes after
    /// `shutdown` fires and in-flight requests drain.
    pub async fn listen(
        &self,
        shutdown: CancellationToken,
    ) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let router = self.router(shutdown.clone())?;
        let addr = self.settings.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        info!(%local_addr, path = %self.settings.path, "echo server started");

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });

        Ok((local_addr, handle))
    }

    /// Listen, announce the address, and serve until `shutdown` fires.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let (addr, handle) = self.listen(shutdown).await?;
        self.reporter
            .ok(&format!("listening on {addr} (press CTRL+C to quit)"));
        if let Err(e) = handle.await {
            error!(error = %e, "server task failed");
        }
        Ok(())
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<EchoState>) -> Response {
    let ws = match &state.subprotocol {
        Some(protocol) => ws.protocols([protocol.clone()]),
        None => ws,
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one upgraded connection.
async fn handle_socket(socket: WebSocket, state: EchoState) {
    let id = Uuid::now_v7();
    let span = info_span!("connection", %id);
    async move {
        state.reporter.ok("client connected");

        if let Some(required) = &state.subprotocol {
            if socket.protocol().is_none() {
                state.reporter.error(&format!(
                    "client did not negotiate subprotocol \"{required}\""
                ));
                release(socket).await;
                return;
            }
        }

        let summary = run_echo(socket, state.options, state.reporter, &state.shutdown).await;
        debug!(
            received = summary.received,
            echoed = summary.echoed,
            "connection finished"
        );
    }
    .instrument(span)
    .await;
}

/// Best-effort close of a connection that never entered the echo loop.
async fn release(mut socket: WebSocket) {
    let close = Message::Close(Some(CloseFrame {
        code: NORMAL_CLOSURE,
        reason: "".into(),
    }));
    if let Err(e) = socket.send(close).await {
        debug!(error = %e, "write close message failed");
    }
    if let Err(e) = SinkExt::close(&mut socket).await {
        debug!(error = %e, "close websocket connection failed");
    }
}
