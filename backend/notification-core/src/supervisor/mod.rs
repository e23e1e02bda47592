//! Connection supervisor.
//!
//! Keeps the notification stream alive for the lifetime of the process:
//!
//! 1. publish `Connecting` and open a channel
//! 2. publish `Connected`, send the handshake credential
//! 3. pump fragments into the assembler and dispatch each complete message,
//!    serving queued sends in between
//! 4. on error, close frame or end of stream: tear down, publish
//!    `Disconnected`, wait for the reconnect delay and start over
//!
//! Channel failures never escape [`Supervisor::run`]; they are logged and
//! retried. Only cancellation ends the loop.
//!
//! # Ownership
//!
//! The channel lives on the supervisor task and nowhere else. Other tasks
//! reach it only through [`NotificationClient::send`], which queues a request
//! that the supervisor serves between reads, so at most one send is in
//! flight and chunks of one message are never interleaved with another.

mod client;
mod handle;
mod reconnect;
mod settings;

pub use client::NotificationClient;
pub use handle::SupervisorHandle;
pub use reconnect::ReconnectPolicy;
pub use settings::SupervisorSettings;

use crate::codec::{FrameAssembler, Reassembly, split_message};
use crate::dispatch::Dispatcher;
use crate::envelope::NotificationEnvelope;
use crate::error::NotificationError;
use crate::status::{ConnectionStatus, StatusPublisher};
use crate::transport::{Channel, Connector};

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use backoff::backoff::Backoff;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use tokio_util::sync::CancellationToken;

/// Upper bound on the closing handshake when tearing a channel down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A message waiting for the supervisor to write it.
pub(crate) struct OutboundRequest {
    pub(crate) message: String,
    /// Connection counter the sender saw as `Connected`.
    pub(crate) connection: u64,
    pub(crate) reply: oneshot::Sender<Result<(), NotificationError>>,
}

/// How one connection ended.
enum Teardown {
    /// Remote closed or the stream ran out.
    Closed,
    Cancelled,
}

/// Owns the channel lifecycle. Build one with [`NotificationClient::new`].
pub struct Supervisor<C: Connector> {
    connector: C,
    settings: SupervisorSettings,
    dispatcher: Dispatcher,
    status: StatusPublisher,
    outbound_rx: mpsc::Receiver<OutboundRequest>,
    cancel: CancellationToken,
    backoff: Box<dyn Backoff + Send>,
}

impl<C: Connector> Supervisor<C> {
    pub(crate) fn new(
        connector: C,
        settings: SupervisorSettings,
        dispatcher: Dispatcher,
        status: StatusPublisher,
        outbound_rx: mpsc::Receiver<OutboundRequest>,
        cancel: CancellationToken,
    ) -> Self {
        let backoff = settings.reconnect.backoff();
        Self {
            connector,
            settings,
            dispatcher,
            status,
            outbound_rx,
            cancel,
            backoff,
        }
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self) -> SupervisorHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        info!("Notification supervisor spawned");
        SupervisorHandle { task, cancel }
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        info!("Notification supervisor started for {}", self.settings.endpoint);

        while !self.cancel.is_cancelled() {
            let outcome = self.run_connection().await;

            self.status.publish(ConnectionStatus::Disconnected);
            self.reject_pending_sends();

            match outcome {
                Ok(Teardown::Cancelled) => break,
                Ok(Teardown::Closed) => info!("Notification channel closed"),
                Err(e) => error!("Notification channel error: {e}"),
            }

            let delay = self
                .backoff
                .next_backoff()
                .unwrap_or_else(|| self.settings.reconnect.fallback_delay());
            info!("Reconnecting in {delay:?}...");

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = TokioSleep(delay) => {}
            }
        }

        self.status.publish(ConnectionStatus::Disconnected);
        self.reject_pending_sends();
        info!("Notification supervisor stopped");
    }

    /// One connect / handshake / receive cycle.
    async fn run_connection(&mut self) -> Result<Teardown, NotificationError> {
        self.status.publish(ConnectionStatus::Connecting);
        info!("Connecting to {}...", self.settings.endpoint);

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = self.connector.connect(&self.settings.endpoint) => Some(result),
        };

        let mut channel = match connected {
            None => return Ok(Teardown::Cancelled),
            Some(result) => result?,
        };

        self.status.publish(ConnectionStatus::Connected);
        let (_, connection) = self.status.snapshot();
        self.backoff.reset();

        let outcome = self.pump(&mut channel, connection).await;
        if TokioTimeout(CLOSE_TIMEOUT, channel.close()).await.is_err() {
            warn!("Channel close did not finish within {CLOSE_TIMEOUT:?}, dropping it");
        }
        outcome
    }

    /// Handshake, then read and serve sends until the channel ends.
    ///
    /// Every await here races cancellation, so a peer that stops reading
    /// cannot hold the supervisor past a shutdown request.
    async fn pump(
        &mut self,
        channel: &mut C::Channel,
        connection: u64,
    ) -> Result<Teardown, NotificationError> {
        let credential = self.settings.credential.clone();
        let handshake = tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Cancellation requested during handshake");
                return Ok(Teardown::Cancelled);
            }
            result = send_message(channel, credential.as_str(), self.settings.chunk_size) => result,
        };
        handshake.map_err(|e| NotificationError::Handshake {
            message: format!("Failed to send handshake: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        debug!("Handshake sent ({} bytes)", credential.len());

        let mut assembler = FrameAssembler::with_limit(self.settings.max_message_bytes);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("Cancellation requested, leaving receive loop");
                    return Ok(Teardown::Cancelled);
                }

                fragment = channel.next_fragment() => {
                    let fragment = match fragment {
                        None => return Ok(Teardown::Closed),
                        Some(fragment) => fragment?,
                    };

                    match assembler.push(fragment) {
                        Ok(Reassembly::Incomplete) => {}
                        Ok(Reassembly::Complete(message)) => self.handle_message(&message),
                        Ok(Reassembly::Closed) => return Ok(Teardown::Closed),
                        Err(e) => warn!("Dropping inbound message: {e}"),
                    }
                }

                Some(request) = self.outbound_rx.recv() => {
                    if request.connection != connection {
                        debug!(
                            "Rejecting send issued for connection {} on connection {connection}",
                            request.connection
                        );
                        let _ = request.reply.send(Err(NotificationError::not_connected()));
                        continue;
                    }

                    let result = tokio::select! {
                        _ = self.cancel.cancelled() => {
                            info!("Cancellation requested while sending, abandoning message");
                            let _ = request.reply.send(Err(NotificationError::stopped()));
                            return Ok(Teardown::Cancelled);
                        }
                        result = send_message(channel, &request.message, self.settings.chunk_size) => result,
                    };

                    match result {
                        Ok(()) => {
                            debug!("Sent message ({} bytes)", request.message.len());
                            let _ = request.reply.send(Ok(()));
                        }
                        Err(e) => {
                            let _ = request.reply.send(Err(NotificationError::Send {
                                message: e.to_string(),
                                location: ErrorLocation::from(Location::caller()),
                            }));
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    fn handle_message(&self, message: &str) {
        let envelope = match NotificationEnvelope::decode(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Ignoring malformed notification: {e}");
                return;
            }
        };

        let report = self.dispatcher.dispatch(&envelope);
        debug!(
            "Dispatched {} to {} handlers ({} failed)",
            envelope.kind, report.invoked, report.failed
        );
    }

    /// Fail sends that were queued while the channel went down.
    fn reject_pending_sends(&mut self) {
        while let Ok(request) = self.outbound_rx.try_recv() {
            let _ = request.reply.send(Err(NotificationError::not_connected()));
        }
    }
}

/// Split `message` and write every chunk in order.
async fn send_message<Ch: Channel>(
    channel: &mut Ch,
    message: &str,
    chunk_size: usize,
) -> Result<(), NotificationError> {
    for chunk in split_message(message.as_bytes(), chunk_size) {
        channel.send_chunk(chunk).await?;
    }
    Ok(())
}
