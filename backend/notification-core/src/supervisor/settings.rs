use super::reconnect::ReconnectPolicy;
use crate::config::NotificationConfig;
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_SEND_QUEUE};

use common::RedactedToken;

/// Everything the supervisor needs to run one client.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// `ws://host:port` of the notification backend.
    pub endpoint: String,
    /// Sent as the first message on every new channel.
    pub credential: RedactedToken,
    pub chunk_size: usize,
    pub max_message_bytes: usize,
    pub send_queue: usize,
    pub reconnect: ReconnectPolicy,
}

impl SupervisorSettings {
    pub fn new(endpoint: impl Into<String>, credential: RedactedToken) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            send_queue: DEFAULT_SEND_QUEUE,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn from_config(config: &NotificationConfig, credential: RedactedToken) -> Self {
        Self {
            endpoint: config.endpoint_url(),
            credential,
            chunk_size: config.transport.chunk_size,
            max_message_bytes: config.transport.max_message_bytes,
            send_queue: config.transport.send_queue,
            reconnect: config.reconnect.policy(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}
