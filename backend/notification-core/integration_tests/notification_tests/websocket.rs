use crate::notification_tests::helpers::{
    TEST_HANDSHAKE_TOKEN, TestBackend, push_fragmented, push_text, receive_text, record_statuses,
    test_settings, wait_until,
};

use notification_core::envelope::kinds::{EntityListUpdated, PlayerJoined};
use notification_core::error::NotificationError;
use notification_core::transport::WsConnector;
use notification_core::{ConnectionStatus, NotificationClient, NotificationKind, OwnerId};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: Verifies the first message on a real WebSocket is the handshake token.
///
/// **WHY THIS MATTERS**: The backend authenticates the stream from its first
/// text message. Anything else first and the channel is useless.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The handshake is sent as binary or masked incorrectly
/// - The supervisor reports Connected without sending the token
#[tokio::test]
async fn given_backend_running_when_client_starts_then_handshake_received() {
    // GIVEN: A backend on an ephemeral port
    let mut backend = TestBackend::start().await;

    // WHEN: The client starts
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));
    let mut ws = backend.accept().await;

    // THEN: First message is the token and the client reports Connected
    assert_eq!(receive_text(&mut ws).await, TEST_HANDSHAKE_TOKEN);
    wait_until(|| client.status() == ConnectionStatus::Connected, "Connected").await;

    handle.shutdown().await.expect("Shutdown failed");
}

/// **VALUE**: Verifies a pushed notification reaches typed and untyped subscribers.
///
/// **WHY THIS MATTERS**: This is the whole point of the client: backend events
/// turning into UI callbacks.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The kind discriminator is read from the wrong field
/// - camelCase payload fields fail to deserialize
/// - Callbacks registered for other kinds are invoked
#[tokio::test]
async fn given_subscriber_when_backend_pushes_notification_then_callback_invoked() {
    // GIVEN: A connected client with subscribers on two kinds
    let mut backend = TestBackend::start().await;
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));

    let joined = Arc::new(Mutex::new(Vec::new()));
    let joined_clone = Arc::clone(&joined);
    client.subscribe_typed::<PlayerJoined, _>(OwnerId::new(), move |event| {
        joined_clone.lock().unwrap().push(event);
        Ok(())
    });
    let left_calls = Arc::new(AtomicUsize::new(0));
    let left_clone = Arc::clone(&left_calls);
    client.subscribe(NotificationKind::PlayerLeft, OwnerId::new(), move |_| {
        left_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut ws = backend.accept().await;
    let _ = receive_text(&mut ws).await;

    // WHEN: The backend pushes PlayerJoined
    push_text(&mut ws, r#"{"type":"PlayerJoined","player":"steve","entityId":7}"#).await;

    // THEN: Only the PlayerJoined subscriber sees it
    wait_until(|| joined.lock().unwrap().len() == 1, "PlayerJoined callback").await;
    assert_eq!(joined.lock().unwrap()[0].player, "steve");
    assert_eq!(joined.lock().unwrap()[0].entity_id, Some(7));
    assert_eq!(left_calls.load(Ordering::SeqCst), 0);

    handle.shutdown().await.expect("Shutdown failed");
}

/// **VALUE**: Verifies a fragmented WebSocket message is delivered as one notification.
///
/// **WHY THIS MATTERS**: Entity lists are large and the backend fragments them.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Continuation frames are treated as separate messages
/// - Multi-byte characters split across fragments are corrupted
#[tokio::test]
async fn given_fragmented_push_when_received_then_reassembled() {
    // GIVEN: A connected client subscribed to entity lists
    let mut backend = TestBackend::start().await;
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));

    let lists = Arc::new(Mutex::new(Vec::new()));
    let lists_clone = Arc::clone(&lists);
    client.subscribe_typed::<EntityListUpdated, _>(OwnerId::new(), move |event| {
        lists_clone.lock().unwrap().push(event);
        Ok(())
    });

    let mut ws = backend.accept().await;
    let _ = receive_text(&mut ws).await;

    // WHEN: A list with many entries arrives in 7-byte fragments
    let entities: Vec<String> = (0..50)
        .map(|i| format!(r#"{{"id":{i},"name":"Wörld {i}","status":"Running"}}"#))
        .collect();
    let message = format!(
        r#"{{"type":"EntityListUpdated","entities":[{}]}}"#,
        entities.join(",")
    );
    push_fragmented(&mut ws, &message, 7).await;

    // THEN: One event with every entity intact
    wait_until(|| lists.lock().unwrap().len() == 1, "EntityListUpdated").await;
    let list = &lists.lock().unwrap()[0];
    assert_eq!(list.entities.len(), 50);
    assert_eq!(list.entities[49].name, "Wörld 49");
    assert_eq!(list.entities[0].version, "Unknown");

    handle.shutdown().await.expect("Shutdown failed");
}

/// **VALUE**: Verifies a long outbound message arrives at the backend intact.
///
/// **WHY THIS MATTERS**: Outbound messages are chunked into 2048-byte frames.
/// The backend must still see exactly one message with the original content.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Continuation frames carry the wrong opcode
/// - The final flag is set on an early chunk
/// - Client frames are not masked
#[tokio::test]
async fn given_long_message_when_sent_then_backend_receives_single_message() {
    // GIVEN: A connected client
    let mut backend = TestBackend::start().await;
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));
    let mut ws = backend.accept().await;
    let _ = receive_text(&mut ws).await;
    wait_until(|| client.status() == ConnectionStatus::Connected, "Connected").await;

    // WHEN: Sending 5000 bytes
    let message: String = "abcdefghij".repeat(500);
    client.send(message.clone()).await.expect("Send failed");

    // THEN: Backend receives one text message equal to the original
    assert_eq!(receive_text(&mut ws).await, message);

    handle.shutdown().await.expect("Shutdown failed");
}

/// **VALUE**: Verifies the client reconnects after the backend drops the socket.
///
/// **WHY THIS MATTERS**: Backends restart. Subscribers must keep receiving
/// without re-registering.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The supervisor exits on a read error
/// - Subscriptions are lost across reconnects
/// - The handshake is not repeated on the new channel
#[tokio::test]
async fn given_backend_drops_connection_when_running_then_reconnects() {
    // GIVEN: A connected client with a subscriber
    let mut backend = TestBackend::start().await;
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    client.subscribe(NotificationKind::PlayerLeft, OwnerId::new(), move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let mut first = backend.accept().await;
    let _ = receive_text(&mut first).await;

    // WHEN: The backend drops the socket without a close frame
    drop(first);

    // THEN: A new connection with a fresh handshake, and the subscriber still works
    let mut second = backend.accept().await;
    assert_eq!(receive_text(&mut second).await, TEST_HANDSHAKE_TOKEN);
    push_text(&mut second, r#"{"type":"PlayerLeft","player":"alex"}"#).await;
    wait_until(|| calls.load(Ordering::SeqCst) == 1, "PlayerLeft after reconnect").await;

    handle.shutdown().await.expect("Shutdown failed");
}

/// **VALUE**: Verifies the client keeps cycling while nothing listens.
///
/// **WHY THIS MATTERS**: The app usually starts before the backend.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A refused connection ends the supervisor
/// - Failed attempts skip the Disconnected status
/// - Sends are queued instead of rejected while disconnected
#[tokio::test]
async fn given_nothing_listening_when_client_starts_then_cycles_and_rejects_sends() {
    // GIVEN: A port with nothing bound to it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    // WHEN: Starting the client against it
    let (client, supervisor) =
        NotificationClient::new(WsConnector, test_settings(format!("ws://127.0.0.1:{port}")));
    let statuses = record_statuses(&client);
    let task = tokio::spawn(supervisor.run());

    // THEN: Several Connecting/Disconnected cycles, never Connected
    wait_until(
        || {
            statuses
                .lock()
                .unwrap()
                .iter()
                .filter(|s| **s == ConnectionStatus::Disconnected)
                .count()
                >= 3
        },
        "three failed attempts",
    )
    .await;
    assert!(
        !statuses
            .lock()
            .unwrap()
            .contains(&ConnectionStatus::Connected)
    );

    let result = client.send("hello").await;
    assert!(matches!(result, Err(NotificationError::NotConnected { .. })));

    client.shutdown();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("Supervisor did not stop")
        .unwrap();
}

/// **VALUE**: Verifies shutdown closes the WebSocket with a close frame.
///
/// **WHY THIS MATTERS**: The backend cleans up per-client state on close.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Shutdown leaves the socket half-open
/// - The supervisor reconnects after shutdown
#[tokio::test]
async fn given_connected_when_shutdown_then_backend_sees_close() {
    // GIVEN: A connected client
    let mut backend = TestBackend::start().await;
    let (client, handle) = NotificationClient::start(WsConnector, test_settings(backend.endpoint()));
    let mut ws = backend.accept().await;
    let _ = receive_text(&mut ws).await;

    // WHEN: Shutting down
    handle.shutdown().await.expect("Shutdown failed");

    // THEN: Backend sees a close frame or end of stream
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("Timed out waiting for close");
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}
