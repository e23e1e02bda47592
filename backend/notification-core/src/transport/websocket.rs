//! WebSocket transport over `tokio-tungstenite`.
//!
//! Outbound chunks are written as raw frames (`Text` first, `Continue`
//! after, FIN on the last) so one logical message stays one fragmented
//! WebSocket message on the wire. tungstenite reassembles inbound
//! fragmentation itself, so each received message surfaces as a single
//! terminal fragment.

use super::{Channel, Connector};
use crate::codec::{InboundFragment, OutboundChunk};
use crate::error::NotificationError;

use common::ErrorLocation;

use std::panic::Location;

use futures_util::{SinkExt, StreamExt};
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Opens WebSocket channels with `connect_async`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self, endpoint: &str) -> Result<WsChannel, NotificationError> {
        let (stream, response) =
            connect_async(endpoint)
                .await
                .map_err(|e| NotificationError::Connect {
                    message: format!("Failed to connect to {endpoint}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

        debug!(
            "WebSocket handshake with {endpoint} completed ({})",
            response.status()
        );

        Ok(WsChannel { stream })
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Channel for WsChannel {
    async fn send_chunk(&mut self, chunk: OutboundChunk) -> Result<(), NotificationError> {
        let opcode = if chunk.index == 0 {
            OpCode::Data(Data::Text)
        } else {
            OpCode::Data(Data::Continue)
        };

        trace!(
            "Sending chunk {} ({} bytes, final={})",
            chunk.index,
            chunk.data.len(),
            chunk.is_final
        );

        let frame = Frame::message(chunk.data, opcode, chunk.is_final);
        self.stream
            .send(Message::Frame(frame))
            .await
            .map_err(|e| NotificationError::Send {
                message: format!("Failed to send chunk {}: {e}", chunk.index),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn next_fragment(&mut self) -> Option<Result<InboundFragment, NotificationError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(NotificationError::Read {
                        message: format!("Error reading from notification channel: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    }));
                }
            };

            match message {
                Message::Text(text) => {
                    return Some(Ok(InboundFragment::text(text.as_str().as_bytes(), true)));
                }
                Message::Binary(bytes) => {
                    return Some(Ok(InboundFragment::binary(bytes.to_vec(), true)));
                }
                Message::Close(frame) => {
                    debug!("Close frame received: {frame:?}");
                    return Some(Ok(InboundFragment::close()));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("Skipping control frame");
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!("Ignoring error while closing channel: {e}");
        }
    }
}
