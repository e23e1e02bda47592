//! Cloneable front door to a running supervisor.

use super::handle::SupervisorHandle;
use super::settings::SupervisorSettings;
use super::{OutboundRequest, Supervisor};
use crate::dispatch::{Dispatcher, OwnerId};
use crate::envelope::{Notification, NotificationEnvelope, NotificationKind};
use crate::error::{HandlerError, NotificationError};
use crate::status::{ConnectionStatus, StatusPublisher};
use crate::transport::Connector;

use common::ErrorLocation;

use std::panic::Location;

use log::warn;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Subscribe to notifications, observe connectivity and send messages.
///
/// All clones talk to the same supervisor.
#[derive(Clone)]
pub struct NotificationClient {
    dispatcher: Dispatcher,
    status: StatusPublisher,
    outbound_tx: mpsc::Sender<OutboundRequest>,
    cancel: CancellationToken,
}

impl NotificationClient {
    /// Build a client and its (not yet running) supervisor.
    pub fn new<C: Connector>(connector: C, settings: SupervisorSettings) -> (Self, Supervisor<C>) {
        let dispatcher = Dispatcher::new();
        let status = StatusPublisher::new();
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(settings.send_queue.max(1));

        let supervisor = Supervisor::new(
            connector,
            settings,
            dispatcher.clone(),
            status.clone(),
            outbound_rx,
            cancel.clone(),
        );

        let client = Self {
            dispatcher,
            status,
            outbound_tx,
            cancel,
        };

        (client, supervisor)
    }

    /// Build a client and spawn its supervisor on the current tokio runtime.
    ///
    /// Subscribers registered after this call may miss the first transitions;
    /// use [`new`](Self::new) and [`Supervisor::spawn`] to register first.
    pub fn start<C: Connector>(connector: C, settings: SupervisorSettings) -> (Self, SupervisorHandle) {
        let (client, supervisor) = Self::new(connector, settings);
        (client, supervisor.spawn())
    }

    /// Send one message over the channel.
    ///
    /// Fails immediately with [`NotificationError::NotConnected`] unless the
    /// channel is connected; nothing is queued for later delivery. A send
    /// that races a disconnect is rejected rather than written to the next
    /// channel.
    pub async fn send(&self, message: impl Into<String>) -> Result<(), NotificationError> {
        let (status, connection) = self.status.snapshot();
        if status != ConnectionStatus::Connected {
            warn!("Notification channel is not connected, cannot send message");
            return Err(NotificationError::not_connected());
        }

        self.enqueue(message.into(), connection).await
    }

    /// Queue `message` for the channel identified by `connection` and wait
    /// for the supervisor's reply.
    pub(crate) async fn enqueue(
        &self,
        message: String,
        connection: u64,
    ) -> Result<(), NotificationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = OutboundRequest {
            message,
            connection,
            reply: reply_tx,
        };

        if let Err(e) = self.outbound_tx.try_send(request) {
            return Err(match e {
                TrySendError::Full(_) => NotificationError::Send {
                    message: String::from("send queue is full"),
                    location: ErrorLocation::from(Location::caller()),
                },
                TrySendError::Closed(_) => NotificationError::stopped(),
            });
        }

        reply_rx.await.map_err(|_| NotificationError::stopped())?
    }

    /// Connection counter currently published, for tests that replay a
    /// send issued against an earlier channel.
    #[cfg(test)]
    pub(crate) fn connection(&self) -> u64 {
        self.status.snapshot().1
    }

    pub fn subscribe<F>(&self, kind: NotificationKind, owner: OwnerId, callback: F)
    where
        F: Fn(&NotificationEnvelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(kind, owner, callback);
    }

    pub fn subscribe_typed<T, F>(&self, owner: OwnerId, callback: F)
    where
        T: Notification,
        F: Fn(T) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.dispatcher.subscribe_typed::<T, F>(owner, callback);
    }

    pub fn unsubscribe(&self, kind: &NotificationKind, owner: OwnerId) -> usize {
        self.dispatcher.unsubscribe(kind, owner)
    }

    pub fn on_status<F>(&self, owner: OwnerId, callback: F)
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.status.subscribe(owner, callback);
    }

    pub fn remove_status_observer(&self, owner: OwnerId) -> usize {
        self.status.unsubscribe(owner)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.current()
    }

    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.watch()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Ask the supervisor to stop. It will not reconnect afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
