//! Typed payloads for the built-in notification kinds.

use super::{Notification, NotificationKind};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub player: String,
    #[serde(default)]
    pub entity_id: Option<u64>,
}

impl Notification for PlayerJoined {
    fn kind() -> NotificationKind {
        NotificationKind::PlayerJoined
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    pub player: String,
    #[serde(default)]
    pub entity_id: Option<u64>,
}

impl Notification for PlayerLeft {
    fn kind() -> NotificationKind {
        NotificationKind::PlayerLeft
    }
}

/// A server process changed lifecycle state (started, stopped, crashed...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatusChanged {
    pub entity_id: u64,
    pub status: String,
}

impl Notification for EntityStatusChanged {
    fn kind() -> NotificationKind {
        NotificationKind::EntityStatusChanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessageAdded {
    pub entity_id: u64,
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
}

impl Notification for ConsoleMessageAdded {
    fn kind() -> NotificationKind {
        NotificationKind::ConsoleMessageAdded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unknown")]
    pub status: String,
    #[serde(default = "unknown")]
    pub version: String,
}

fn unknown() -> String {
    String::from("Unknown")
}

/// Full replacement of the entity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListUpdated {
    #[serde(default)]
    pub entities: Vec<EntitySummary>,
}

impl Notification for EntityListUpdated {
    fn kind() -> NotificationKind {
        NotificationKind::EntityListUpdated
    }
}
