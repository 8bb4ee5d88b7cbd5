//! Echo server over real TCP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_util::sync::CancellationToken;
use wsline_client::{CloseTrigger, SessionPhase, run_client};
use wsline_core::MemoryReporter;
use wsline_server::EchoServer;
use wsline_settings::{ClientSettings, ServerSettings};

struct Running {
    addr: SocketAddr,
    reporter: Arc<MemoryReporter>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Running {
    fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop after shutdown")
            .unwrap();
    }
}

async fn start(settings: ServerSettings) -> Running {
    let reporter = Arc::new(MemoryReporter::new());
    let shutdown = CancellationToken::new();
    let server = EchoServer::new(settings, reporter.clone());
    let (addr, handle) = server.listen(shutdown.clone()).await.unwrap();
    Running {
        addr,
        reporter,
        shutdown,
        handle,
    }
}

async fn wait_for(reporter: &MemoryReporter, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !reporter.contains(needle) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("never reported {needle:?}: {:?}", reporter.lines()));
}

#[tokio::test]
async fn text_is_echoed_exactly_once() {
    let server = start(ServerSettings {
        echo: true,
        ..ServerSettings::default()
    })
    .await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
    ws.send(Message::Text("ping-test".into())).await.unwrap();
    ws.send(Message::Binary(vec![0xde, 0xad].into())).await.unwrap();
    ws.send(Message::Text("second".into())).await.unwrap();

    let first = ws.next().await.unwrap().unwrap();
    let second = ws.next().await.unwrap().unwrap();
    assert_eq!(first, Message::Text("ping-test".into()));
    assert_eq!(second, Message::Text("second".into()));

    ws.close(None).await.unwrap();
    let mut rest = Vec::new();
    while let Some(Ok(message)) = ws.next().await {
        rest.push(message);
    }
    assert!(
        rest.iter().all(|m| matches!(m, Message::Close(_))),
        "binary must never be echoed: {rest:?}"
    );

    wait_for(&server.reporter, "<< 3q0=").await;
    assert!(server.reporter.contains("client connected"));
    assert!(server.reporter.contains("< ping-test"));
    server.stop().await;
}

#[tokio::test]
async fn missing_subprotocol_is_rejected_after_upgrade() {
    let server = start(ServerSettings {
        echo: true,
        subprotocol: Some("chat".into()),
        ..ServerSettings::default()
    })
    .await;

    let (mut ws, response) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
    assert!(response.headers().get("sec-websocket-protocol").is_none());

    match ws.next().await {
        Some(Ok(Message::Close(Some(frame)))) => assert_eq!(u16::from(frame.code), 1000),
        other => panic!("expected close frame, got {other:?}"),
    }

    wait_for(&server.reporter, "did not negotiate subprotocol").await;
    assert_eq!(server.reporter.errors().len(), 1);
    server.stop().await;
}

#[tokio::test]
async fn matching_subprotocol_is_selected() {
    let server = start(ServerSettings {
        echo: true,
        subprotocol: Some("chat".into()),
        ..ServerSettings::default()
    })
    .await;

    let mut request = server.url().into_client_request().unwrap();
    let _ = request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("chat"));
    let (mut ws, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("sec-websocket-protocol").unwrap(),
        "chat"
    );

    ws.send(Message::Text("hi".into())).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::Text("hi".into()));
    assert!(server.reporter.errors().is_empty());

    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}
    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let server = start(ServerSettings::default()).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(server.url()).await.unwrap();
    wait_for(&server.reporter, "client connected").await;

    server.shutdown.cancel();
    match ws.next().await {
        Some(Ok(Message::Close(Some(frame)))) => assert_eq!(u16::from(frame.code), 1000),
        other => panic!("expected close frame, got {other:?}"),
    }
    server.stop().await;
}

#[tokio::test]
async fn scripted_client_sees_its_echo() {
    let server = start(ServerSettings {
        echo: true,
        ..ServerSettings::default()
    })
    .await;

    let client_reporter = Arc::new(MemoryReporter::new());
    let settings = ClientSettings {
        execute: Some("hello".into()),
        wait_secs: 1,
        ..ClientSettings::default()
    };
    let outcome = run_client(
        &server.url(),
        &settings,
        client_reporter.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.trigger, CloseTrigger::Timeout);
    assert_eq!(outcome.phase, SessionPhase::Closed);
    assert!(client_reporter.contains("Connected (press CTRL+C to quit)"));
    assert!(client_reporter.contains("< hello"));
    assert!(client_reporter.errors().is_empty());

    wait_for(&server.reporter, "< hello").await;
    server.stop().await;
}
