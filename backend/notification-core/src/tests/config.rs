// Unit tests for config loading, saving and validation

use crate::config::{NotificationConfig, ReconnectStrategy, load_handshake_token};
use crate::config::HandshakeConfig;
use crate::error::ConfigError;
use crate::supervisor::ReconnectPolicy;
use crate::{DEFAULT_CHUNK_SIZE, NOTIFICATION_ENDPOINT};

use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

#[test]
fn given_defaults_when_inspected_then_match_wire_constants() {
    let config = NotificationConfig::default();

    assert_eq!(config.endpoint_url(), NOTIFICATION_ENDPOINT);
    assert_eq!(config.endpoint_url(), "ws://127.0.0.1:35565");
    assert_eq!(config.transport.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(
        config.reconnect.policy(),
        ReconnectPolicy::Fixed(Duration::from_millis(500))
    );
    assert!(config.validate().is_ok());
}

/// **VALUE**: A missing config file yields defaults instead of an error.
///
/// **WHY THIS MATTERS**: First launch has no config; the client must still
/// connect to the well-known endpoint.
///
/// **BUG THIS CATCHES**: Would catch `load` treating NotFound as a read error.
#[test]
fn given_empty_dir_when_load_then_returns_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().unwrap();

    // WHEN: Loading
    let config = NotificationConfig::load(dir.path()).unwrap();

    // THEN: Defaults
    assert_eq!(config, NotificationConfig::default());
}

#[test]
fn given_saved_config_when_loaded_then_values_survive() {
    let dir = TempDir::new().unwrap();
    let mut config = NotificationConfig::default();
    config.endpoint.port = 40000;
    config.reconnect.strategy = ReconnectStrategy::Exponential;
    config.reconnect.delay_ms = 250;

    config.save(dir.path()).unwrap();
    let loaded = NotificationConfig::load(dir.path()).unwrap();

    assert_eq!(loaded, config);
    assert!(!dir.path().join("notifications.json.tmp").exists());
    assert_eq!(
        loaded.reconnect.policy(),
        ReconnectPolicy::Exponential {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(30),
        }
    );
}

/// **VALUE**: Partial files fill the gaps from defaults.
///
/// **WHY THIS MATTERS**: Users hand-edit the file and usually only set the port.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on a section.
#[test]
fn given_partial_file_when_loaded_then_missing_sections_default() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("notifications.json"),
        r#"{ "endpoint": { "port": 36000 } }"#,
    )
    .unwrap();

    let config = NotificationConfig::load(dir.path()).unwrap();

    assert_eq!(config.endpoint.port, 36000);
    assert_eq!(config.endpoint.host, "127.0.0.1");
    assert_eq!(config.transport.chunk_size, DEFAULT_CHUNK_SIZE);
}

#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notifications.json"), "{ not json").unwrap();

    let result = NotificationConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_invalid_values_when_validated_then_rejected() {
    let cases: Vec<(&str, fn(&mut NotificationConfig))> = vec![
        ("version 0", |c| c.version = 0),
        ("empty host", |c| c.endpoint.host = String::from(" ")),
        ("port 0", |c| c.endpoint.port = 0),
        ("bad host", |c| c.endpoint.host = String::from("bad host")),
        ("chunk 0", |c| c.transport.chunk_size = 0),
        ("limit below chunk", |c| c.transport.max_message_bytes = 10),
        ("queue 0", |c| c.transport.send_queue = 0),
        ("delay 0", |c| c.reconnect.delay_ms = 0),
        ("token env empty", |c| c.handshake.token_env = String::new()),
    ];

    for (name, mutate) in cases {
        let mut config = NotificationConfig::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{name} should fail validation"
        );
    }
}

/// **VALUE**: The handshake token is read from the configured variable.
///
/// **WHY THIS MATTERS**: The credential is injected, never hardcoded.
///
/// **BUG THIS CATCHES**: Would catch the loader ignoring `token_env`.
#[test]
#[serial]
fn given_token_env_set_when_loaded_then_returns_token() {
    // GIVEN: A custom variable holding the token
    let config = HandshakeConfig {
        token_env: String::from("NOTIFY_TEST_TOKEN_PRESENT"),
    };
    // SAFETY: serialized with other env-mutating tests via #[serial]
    unsafe { std::env::set_var("NOTIFY_TEST_TOKEN_PRESENT", "abc123") };

    // WHEN: Loading
    let token = load_handshake_token(&config).unwrap();

    // THEN: Value is available for the handshake but redacted in Debug
    assert_eq!(token.as_str(), "abc123");
    assert!(!format!("{token:?}").contains("abc123"));

    unsafe { std::env::remove_var("NOTIFY_TEST_TOKEN_PRESENT") };
}

#[test]
#[serial]
fn given_token_env_missing_or_blank_when_loaded_then_missing_credential() {
    let config = HandshakeConfig {
        token_env: String::from("NOTIFY_TEST_TOKEN_ABSENT"),
    };
    unsafe { std::env::remove_var("NOTIFY_TEST_TOKEN_ABSENT") };

    assert!(matches!(
        load_handshake_token(&config),
        Err(ConfigError::MissingCredential { .. })
    ));

    unsafe { std::env::set_var("NOTIFY_TEST_TOKEN_ABSENT", "  ") };
    assert!(matches!(
        load_handshake_token(&config),
        Err(ConfigError::MissingCredential { .. })
    ));

    unsafe { std::env::remove_var("NOTIFY_TEST_TOKEN_ABSENT") };
}
