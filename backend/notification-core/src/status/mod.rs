//! Connection status tracking.
//!
//! The supervisor is the only writer. Observers are called synchronously on
//! the supervisor task for every transition, in registration order; async
//! consumers can wait on a `watch` receiver instead.

use crate::dispatch::{OwnerId, panic_message};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{error, info};
use tokio::sync::watch;

/// Lifecycle of the notification channel.
///
/// Cycles `Disconnected -> Connecting -> Connected -> Disconnected`; a failed
/// connect attempt goes straight from `Connecting` back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl Display for ConnectionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
        };
        formatter.write_str(name)
    }
}

pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Current status plus a counter bumped on every transition to `Connected`,
/// so a sender can tell which channel its status check referred to.
#[derive(Debug, Clone, Copy)]
struct StatusState {
    status: ConnectionStatus,
    connection: u64,
}

struct StatusInner {
    current: Mutex<StatusState>,
    observers: RwLock<Vec<(OwnerId, StatusCallback)>>,
    watch_tx: watch::Sender<ConnectionStatus>,
}

/// Publishes [`ConnectionStatus`] transitions.
///
/// `Clone` shares the same state and observer list.
#[derive(Clone)]
pub struct StatusPublisher {
    inner: Arc<StatusInner>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(StatusInner {
                current: Mutex::new(StatusState {
                    status: ConnectionStatus::Disconnected,
                    connection: 0,
                }),
                observers: RwLock::new(Vec::new()),
                watch_tx,
            }),
        }
    }

    pub fn current(&self) -> ConnectionStatus {
        self.snapshot().0
    }

    /// Status and connection counter, read together.
    pub(crate) fn snapshot(&self) -> (ConnectionStatus, u64) {
        let state = *self
            .inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (state.status, state.connection)
    }

    /// Register an observer called with the new status on every transition.
    pub fn subscribe<F>(&self, owner: OwnerId, callback: F)
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((owner, Arc::new(callback)));
    }

    /// Remove all observers registered by `owner`; returns how many.
    pub fn unsubscribe(&self, owner: OwnerId) -> usize {
        let mut observers = self
            .inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(id, _)| *id != owner);
        before - observers.len()
    }

    /// Receiver that always holds the latest status.
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.watch_tx.subscribe()
    }

    /// Record `status` and notify observers if it differs from the current one.
    ///
    /// Returns whether a transition happened.
    pub(crate) fn publish(&self, status: ConnectionStatus) -> bool {
        {
            let mut current = self
                .inner
                .current
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if current.status == status {
                return false;
            }
            info!("Notification channel: {} -> {status}", current.status);
            current.status = status;
            if status == ConnectionStatus::Connected {
                current.connection += 1;
            }
        }

        let observers: Vec<StatusCallback> = self
            .inner
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for observer in observers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| observer(status))) {
                error!(
                    "Status observer panicked on {status}: {}",
                    panic_message(panic.as_ref())
                );
            }
        }

        self.inner.watch_tx.send_replace(status);
        true
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}
