//! Logs every notification and connectivity change the backend produces.

use crate::error::MonitorError;

use notification_core::config::{NotificationConfig, load_handshake_token};
use notification_core::envelope::kinds::{
    ConsoleMessageAdded, EntityListUpdated, EntityStatusChanged, PlayerJoined, PlayerLeft,
};
use notification_core::transport::{Connector, WsConnector};
use notification_core::{
    ConnectionStatus, Notification, NotificationClient, NotificationKind, OwnerId,
    SupervisorHandle, SupervisorSettings,
};

use common::ErrorLocation;

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use log::{Level, debug, info, log};

const KNOWN_KINDS: [NotificationKind; 5] = [
    NotificationKind::EntityStatusChanged,
    NotificationKind::EntityListUpdated,
    NotificationKind::ConsoleMessageAdded,
    NotificationKind::PlayerJoined,
    NotificationKind::PlayerLeft,
];

type Tally = Arc<Mutex<HashMap<NotificationKind, u64>>>;

/// Subscriber set registered on one client under a single owner.
pub struct Monitor {
    client: NotificationClient,
    owner: OwnerId,
    tally: Tally,
    transitions: Arc<Mutex<Vec<ConnectionStatus>>>,
}

impl Monitor {
    /// Register logging subscribers for every known kind plus a status observer.
    pub fn attach(client: &NotificationClient) -> Self {
        let owner = OwnerId::new();
        let tally: Tally = Arc::default();
        let transitions = Arc::new(Mutex::new(Vec::new()));

        subscribe_logged::<PlayerJoined>(client, owner, &tally, |event| {
            info!("{} joined{}", event.player, on_entity(event.entity_id));
        });
        subscribe_logged::<PlayerLeft>(client, owner, &tally, |event| {
            info!("{} left{}", event.player, on_entity(event.entity_id));
        });
        subscribe_logged::<EntityStatusChanged>(client, owner, &tally, |event| {
            info!("Entity {} is now {}", event.entity_id, event.status);
        });
        subscribe_logged::<ConsoleMessageAdded>(client, owner, &tally, |event| {
            log!(
                console_level(event.level.as_deref()),
                "[entity {}] {}",
                event.entity_id,
                event.message
            );
        });
        subscribe_logged::<EntityListUpdated>(client, owner, &tally, |event| {
            info!("Entity list updated: {} entities", event.entities.len());
            for entity in &event.entities {
                debug!(
                    "  #{} {} ({}, {})",
                    entity.id, entity.name, entity.status, entity.version
                );
            }
        });

        let transitions_clone = Arc::clone(&transitions);
        client.on_status(owner, move |status| {
            info!("Notification channel {status}");
            transitions_clone
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(status);
        });

        Self {
            client: client.clone(),
            owner,
            tally,
            transitions,
        }
    }

    /// Notifications of `kind` handled so far.
    pub fn received(&self, kind: &NotificationKind) -> u64 {
        self.tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .copied()
            .unwrap_or(0)
    }

    /// Status transitions observed since [`attach`](Self::attach).
    pub fn transitions(&self) -> Vec<ConnectionStatus> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove every subscriber this monitor registered.
    pub fn detach(&self) -> usize {
        let removed: usize = KNOWN_KINDS
            .iter()
            .map(|kind| self.client.unsubscribe(kind, self.owner))
            .sum();
        removed + self.client.remove_status_observer(self.owner)
    }
}

fn subscribe_logged<T>(
    client: &NotificationClient,
    owner: OwnerId,
    tally: &Tally,
    describe: impl Fn(&T) + Send + Sync + 'static,
) where
    T: Notification,
{
    let tally = Arc::clone(tally);
    client.subscribe_typed::<T, _>(owner, move |event: T| {
        describe(&event);
        *tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(T::kind())
            .or_insert(0) += 1;
        Ok(())
    });
}

fn on_entity(entity_id: Option<u64>) -> String {
    entity_id
        .map(|id| format!(" on entity {id}"))
        .unwrap_or_default()
}

/// Map a console line's level onto the log level it is echoed at.
pub fn console_level(level: Option<&str>) -> Level {
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("error" | "fatal" | "severe") => Level::Error,
        Some("warn" | "warning") => Level::Warn,
        Some("debug") => Level::Debug,
        Some("trace") => Level::Trace,
        _ => Level::Info,
    }
}

/// Build a client, attach a [`Monitor`] and only then spawn the supervisor,
/// so the first `Connecting` and any early notification are observed.
pub fn launch<C: Connector>(connector: C, settings: SupervisorSettings) -> (Monitor, SupervisorHandle) {
    let (client, supervisor) = NotificationClient::new(connector, settings);
    let monitor = Monitor::attach(&client);
    (monitor, supervisor.spawn())
}

/// Load config and credential from `config_dir`, run until `shutdown`
/// completes, then stop the supervisor.
///
/// # Errors
///
/// Returns [`MonitorError::Core`] if the config or credential cannot be
/// loaded, or the supervisor task fails to stop.
pub async fn run(
    config_dir: &Path,
    shutdown: impl Future<Output = ()>,
) -> Result<(), MonitorError> {
    let config = NotificationConfig::load(config_dir).map_err(core_error)?;
    let credential = load_handshake_token(&config.handshake).map_err(core_error)?;

    info!("Monitoring notifications from {}", config.endpoint_url());

    let settings = SupervisorSettings::from_config(&config, credential);
    let (monitor, handle) = launch(WsConnector, settings);

    shutdown.await;
    info!("Shutdown requested");

    handle.shutdown().await.map_err(core_error)?;

    let removed = monitor.detach();
    debug!("Removed {removed} subscribers");
    for kind in KNOWN_KINDS {
        let count = monitor.received(&kind);
        if count > 0 {
            info!("{kind}: {count} received");
        }
    }
    debug!("Observed {} status transitions", monitor.transitions().len());

    Ok(())
}

#[track_caller]
fn core_error(e: impl std::fmt::Display) -> MonitorError {
    MonitorError::Core {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
