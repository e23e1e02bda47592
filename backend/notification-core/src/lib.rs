//! Client-side notification pipeline.
//!
//! Keeps one long-lived channel to the backend alive, reassembles fragmented
//! messages and fans decoded notifications out to kind-specific subscribers.
//!
//! ```text
//!   Connector ─► Channel ─► FrameAssembler ─► NotificationEnvelope ─► Dispatcher ─► callbacks
//!                   ▲
//!   Supervisor ─────┴─ owns the channel, publishes ConnectionStatus ─► StatusPublisher
//! ```

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod status;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
mod tests;

pub use dispatch::{DispatchReport, Dispatcher, OwnerId};
pub use envelope::{Notification, NotificationEnvelope, NotificationKind};
pub use status::{ConnectionStatus, StatusPublisher};
pub use supervisor::{NotificationClient, Supervisor, SupervisorHandle, SupervisorSettings};

use std::time::Duration;

pub const NOTIFICATION_HOSTNAME: &str = "127.0.0.1";
pub const NOTIFICATION_PORT: u16 = 35565;
pub const NOTIFICATION_ENDPOINT: &str =
    const_format::concatcp!("ws://", NOTIFICATION_HOSTNAME, ":", NOTIFICATION_PORT);

/// Maximum bytes per outbound frame.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Upper bound for one reassembled inbound message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Capacity of the queue between `NotificationClient::send` and the supervisor.
pub const DEFAULT_SEND_QUEUE: usize = 64;
