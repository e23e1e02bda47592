use notify_monitor::error::MonitorError;
use notify_monitor::monitor;

use notification_core::config::NotificationConfig;

use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serial_test::serial;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const TOKEN_ENV: &str = "NOTIFY_MONITOR_IT_TOKEN";
const TOKEN: &str = "monitor-token-42";

fn write_config(dir: &Path, port: u16, token_env: &str) {
    let mut config = NotificationConfig::default();
    config.endpoint.port = port;
    config.reconnect.delay_ms = 20;
    config.handshake.token_env = token_env.to_string();
    config.save(dir).expect("Failed to save config");
}

/// **VALUE**: Verifies the monitor runs end to end from a config directory.
///
/// **WHY THIS MATTERS**: This is exactly what the binary does: load config and
/// token, connect, log notifications, stop on a shutdown signal.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The config's endpoint or token variable is ignored
/// - Shutdown hangs or returns an error
#[tokio::test]
#[serial]
async fn given_config_and_backend_when_run_then_handshakes_and_stops_cleanly() {
    // GIVEN: A backend and a config pointing at it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config_dir = TempDir::new().unwrap();
    write_config(config_dir.path(), port, TOKEN_ENV);
    // SAFETY: env-mutating tests are #[serial]
    unsafe { std::env::set_var(TOKEN_ENV, TOKEN) };

    // WHEN: Running the monitor
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let dir = config_dir.path().to_path_buf();
    let task = tokio::spawn(async move {
        monitor::run(&dir, async {
            let _ = stop_rx.await;
        })
        .await
    });

    // THEN: Backend receives the token, accepts a push, and the monitor stops on request
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("Monitor never connected")
        .unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("No handshake")
        .unwrap()
        .unwrap();
    assert_eq!(first, Message::text(TOKEN));

    ws.send(Message::text(r#"{"type":"PlayerJoined","player":"steve"}"#))
        .await
        .unwrap();

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("Monitor did not stop")
        .unwrap();
    assert!(result.is_ok(), "run failed: {result:?}");

    unsafe { std::env::remove_var(TOKEN_ENV) };
}

#[tokio::test]
#[serial]
async fn given_missing_token_when_run_then_fails_before_connecting() {
    let config_dir = TempDir::new().unwrap();
    write_config(config_dir.path(), 35565, "NOTIFY_MONITOR_IT_UNSET");
    unsafe { std::env::remove_var("NOTIFY_MONITOR_IT_UNSET") };

    let result = monitor::run(config_dir.path(), async {}).await;

    match result {
        Err(MonitorError::Core { message, .. }) => {
            assert!(message.contains("NOTIFY_MONITOR_IT_UNSET"), "got {message}");
        }
        other => panic!("Expected Core error, got {other:?}"),
    }
}
