//! Physical channel abstraction.
//!
//! The supervisor is generic over a [`Connector`] so the lifecycle logic can
//! run against the real WebSocket transport in production and against
//! in-memory channels in tests.

mod websocket;

pub use websocket::{WsChannel, WsConnector};

use crate::codec::{InboundFragment, OutboundChunk};
use crate::error::NotificationError;

use std::future::Future;

/// Opens physical channels to an endpoint.
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel;

    /// Open a new channel, completing the transport-level handshake.
    fn connect(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Self::Channel, NotificationError>> + Send;
}

/// One open full-duplex channel, exclusively owned by the supervisor.
pub trait Channel: Send + 'static {
    /// Write one chunk. Chunks of a message arrive in call order.
    fn send_chunk(
        &mut self,
        chunk: OutboundChunk,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;

    /// Next inbound fragment, or `None` once the stream has ended.
    ///
    /// Must be cancel-safe: the supervisor polls it inside `select!`.
    fn next_fragment(
        &mut self,
    ) -> impl Future<Output = Option<Result<InboundFragment, NotificationError>>> + Send;

    /// Best-effort close. Errors are ignored since the channel is being dropped.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
