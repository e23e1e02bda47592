//! Test helpers for notification integration tests.
//!
//! This module provides a real WebSocket backend for the client to talk to:
//! - Binding on an ephemeral port
//! - Handing each accepted connection to the test
//! - Reading text messages and pushing (optionally fragmented) notifications

use notification_core::supervisor::ReconnectPolicy;
use notification_core::{ConnectionStatus, NotificationClient, OwnerId, SupervisorSettings};

use common::RedactedToken;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Test constants for the handshake
pub const TEST_HANDSHAKE_TOKEN: &str = "test-token-12345";

pub type ServerSocket = WebSocketStream<TcpStream>;

/// A backend on 127.0.0.1 that hands accepted connections to the test.
pub struct TestBackend {
    pub port: u16,
    connections: mpsc::UnboundedReceiver<ServerSocket>,
}

impl TestBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test backend");
        let port = listener.local_addr().expect("No local addr").port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                if tx.send(ws).is_err() {
                    break;
                }
            }
        });

        Self {
            port,
            connections: rx,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Wait for the client to connect.
    pub async fn accept(&mut self) -> ServerSocket {
        tokio::time::timeout(Duration::from_secs(5), self.connections.recv())
            .await
            .expect("Timed out waiting for client connection")
            .expect("Accept loop stopped")
    }
}

/// Settings pointing at `endpoint` with a short reconnect delay.
pub fn test_settings(endpoint: String) -> SupervisorSettings {
    SupervisorSettings::new(endpoint, RedactedToken::new(TEST_HANDSHAKE_TOKEN))
        .with_reconnect(ReconnectPolicy::Fixed(Duration::from_millis(20)))
}

/// Next text message from the client, skipping control frames.
pub async fn receive_text(ws: &mut ServerSocket) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for client message")
            .expect("Client disconnected")
            .expect("Error receiving message");

        match msg {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected text message, got {other:?}"),
        }
    }
}

pub async fn push_text(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::text(text))
        .await
        .expect("Failed to push notification");
}

/// Push `text` as several WebSocket fragments of `piece` bytes.
pub async fn push_fragmented(ws: &mut ServerSocket, text: &str, piece: usize) {
    let bytes = text.as_bytes();
    let pieces: Vec<&[u8]> = bytes.chunks(piece).collect();
    let last = pieces.len() - 1;

    for (index, data) in pieces.into_iter().enumerate() {
        let opcode = if index == 0 {
            OpCode::Data(Data::Text)
        } else {
            OpCode::Data(Data::Continue)
        };
        ws.send(Message::Frame(Frame::message(data.to_vec(), opcode, index == last)))
            .await
            .expect("Failed to push fragment");
    }
}

/// Record every status the client publishes from now on.
pub fn record_statuses(client: &NotificationClient) -> Arc<Mutex<Vec<ConnectionStatus>>> {
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_clone = Arc::clone(&statuses);
    client.on_status(OwnerId::new(), move |status| {
        statuses_clone.lock().unwrap().push(status)
    });
    statuses
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
