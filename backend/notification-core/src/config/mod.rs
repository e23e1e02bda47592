pub mod credential;

pub use credential::load_handshake_token;

use crate::error::config::ConfigError;
use crate::supervisor::ReconnectPolicy;
use crate::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_RECONNECT_DELAY, DEFAULT_SEND_QUEUE,
    NOTIFICATION_HOSTNAME, NOTIFICATION_PORT,
};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "notifications.json";
const CONFIG_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "notify-monitor";

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    #[default]
    Fixed,
    Exponential,
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_message_bytes: default_max_message_bytes(),
            send_queue: default_send_queue(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub strategy: ReconnectStrategy,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::default(),
            delay_ms: default_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        let delay = Duration::from_millis(self.delay_ms);
        match self.strategy {
            ReconnectStrategy::Fixed => ReconnectPolicy::Fixed(delay),
            ReconnectStrategy::Exponential => ReconnectPolicy::Exponential {
                initial: delay,
                max: Duration::from_millis(self.max_delay_ms.max(self.delay_ms)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandshakeConfig {
    /// Environment variable holding the handshake token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub handshake: HandshakeConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            endpoint: EndpointConfig::default(),
            transport: TransportConfig::default(),
            reconnect: ReconnectConfig::default(),
            handshake: HandshakeConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    NOTIFICATION_HOSTNAME.to_string()
}
fn default_port() -> u16 {
    NOTIFICATION_PORT
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}
fn default_send_queue() -> usize {
    DEFAULT_SEND_QUEUE
}
fn default_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_token_env() -> String {
    "NOTIFY_HANDSHAKE_TOKEN".to_string()
}

// ============================================
// IMPLEMENTATION
// ============================================

/// Platform config directory for the notification client.
///
/// # Errors
///
/// Returns [`ConfigError::DirectoryNotFound`] when the platform has no config
/// directory (e.g. `$HOME` unset).
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| ConfigError::DirectoryNotFound {
            location: ErrorLocation::from(Location::caller()),
        })
}

impl NotificationConfig {
    /// Load config from {config_dir}/notifications.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NotificationConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: NotificationConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/notifications.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.endpoint.host.trim().is_empty() {
            return Err(validation_error("endpoint.host cannot be empty"));
        }

        if self.endpoint.port == 0 {
            return Err(validation_error("endpoint.port cannot be 0"));
        }

        let url = self.endpoint_url();
        if let Err(e) = Url::parse(&url) {
            return Err(validation_error(format!("Invalid endpoint URL {url}: {e}")));
        }

        if self.transport.chunk_size == 0 {
            return Err(validation_error("transport.chunk_size must be at least 1"));
        }

        if self.transport.max_message_bytes < self.transport.chunk_size {
            return Err(validation_error(format!(
                "transport.max_message_bytes ({}) must be >= chunk_size ({})",
                self.transport.max_message_bytes, self.transport.chunk_size
            )));
        }

        if self.transport.send_queue == 0 {
            return Err(validation_error("transport.send_queue must be at least 1"));
        }

        if self.reconnect.delay_ms == 0 {
            return Err(validation_error("reconnect.delay_ms must be at least 1"));
        }

        if self.handshake.token_env.trim().is_empty() {
            return Err(validation_error("handshake.token_env cannot be empty"));
        }

        Ok(())
    }

    /// `ws://{host}:{port}`
    pub fn endpoint_url(&self) -> String {
        format!("ws://{}:{}", self.endpoint.host, self.endpoint.port)
    }
}

#[track_caller]
fn validation_error(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}
