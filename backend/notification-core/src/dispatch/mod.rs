//! Kind-keyed publish/subscribe for decoded notifications.
//!
//! The transport never sees subscribers. The supervisor hands each decoded
//! envelope to [`Dispatcher::dispatch`], which invokes every callback
//! registered for that envelope's kind in registration order.
//!
//! # Concurrency
//!
//! Registrations live behind a `std::sync::RwLock`. Dispatch clones the
//! callback list for one kind under the read lock and runs the callbacks
//! after releasing it, so a callback may subscribe or unsubscribe without
//! deadlocking and no reader ever observes a half-updated list.

use crate::envelope::{Notification, NotificationEnvelope, NotificationKind};
use crate::error::HandlerError;

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, error, trace};
use uuid::Uuid;

/// Callback invoked with every envelope of the kind it was registered for.
pub type NotificationCallback =
    Arc<dyn Fn(&NotificationEnvelope) -> Result<(), HandlerError> + Send + Sync>;

/// Opaque identity used to remove a subscriber's callbacks in bulk.
///
/// Several registrations may share one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OwnerId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Clone)]
struct Registration {
    owner: OwnerId,
    callback: NotificationCallback,
}

/// Result of one [`Dispatcher::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that were called (including ones that failed).
    pub invoked: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

/// Routes envelopes to the callbacks registered for their kind.
///
/// `Clone` shares the same registration table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registrations: Arc<RwLock<HashMap<NotificationKind, Vec<Registration>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `kind`.
    ///
    /// Repeated registrations are not deduplicated; the same closure
    /// registered twice runs twice.
    pub fn subscribe<F>(&self, kind: NotificationKind, owner: OwnerId, callback: F)
    where
        F: Fn(&NotificationEnvelope) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let row = registrations.entry(kind.clone()).or_default();
        row.push(Registration {
            owner,
            callback: Arc::new(callback),
        });

        debug!(
            "Registered handler for {kind} (owner {owner}, {} total)",
            row.len()
        );
    }

    /// Register a callback that receives the payload decoded as `T`.
    ///
    /// A payload that does not fit `T` counts as a failed callback.
    pub fn subscribe_typed<T, F>(&self, owner: OwnerId, callback: F)
    where
        T: Notification,
        F: Fn(T) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let kind = T::kind();
        let kind_name = kind.to_string();
        self.subscribe(kind, owner, move |envelope| {
            let payload = envelope
                .payload_as::<T>()
                .map_err(|e| HandlerError::payload(kind_name.as_str(), e.to_string()))?;
            callback(payload)
        });
    }

    /// Remove every callback under `kind` registered by `owner`.
    ///
    /// Returns how many were removed. The kind's row stays in the table even
    /// when it ends up empty.
    pub fn unsubscribe(&self, kind: &NotificationKind, owner: OwnerId) -> usize {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(row) = registrations.get_mut(kind) else {
            return 0;
        };

        let before = row.len();
        row.retain(|registration| registration.owner != owner);
        let removed = before - row.len();

        debug!("Unregistered {removed} handlers for {kind} (owner {owner})");
        removed
    }

    /// Invoke every callback registered for the envelope's kind.
    ///
    /// Unknown kinds are dropped silently. A failing or panicking callback is
    /// logged and the remaining callbacks still run.
    pub fn dispatch(&self, envelope: &NotificationEnvelope) -> DispatchReport {
        let snapshot: Vec<Registration> = {
            let registrations = self
                .registrations
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            match registrations.get(&envelope.kind) {
                Some(row) => row.clone(),
                None => {
                    trace!("No handlers registered for {}, dropping", envelope.kind);
                    return DispatchReport::default();
                }
            }
        };

        let mut report = DispatchReport::default();

        for registration in snapshot {
            report.invoked += 1;

            match catch_unwind(AssertUnwindSafe(|| (registration.callback)(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(
                        "Handler for {} (owner {}) failed: {e}",
                        envelope.kind, registration.owner
                    );
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        "Handler for {} (owner {}) panicked: {}",
                        envelope.kind,
                        registration.owner,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        report
    }

    /// Kinds that have a row in the table, including emptied ones.
    pub fn registered_kinds(&self) -> Vec<NotificationKind> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn handler_count(&self, kind: &NotificationKind) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .map_or(0, Vec::len)
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
