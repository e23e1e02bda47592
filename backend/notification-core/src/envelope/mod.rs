//! Notification envelopes and the kind discriminator.
//!
//! Every inbound message is one JSON object. Its `"type"` field names the
//! notification kind; all remaining top-level fields are the kind-specific
//! payload:
//!
//! ```json
//! { "type": "PlayerJoined", "entityId": 3, "player": "steve" }
//! ```

pub mod kinds;

pub use kinds::{
    ConsoleMessageAdded, EntityListUpdated, EntityStatusChanged, EntitySummary, PlayerJoined,
    PlayerLeft,
};

use crate::error::NotificationError;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON field carrying the discriminator.
pub const KIND_FIELD: &str = "type";

/// Discriminator identifying which event an envelope represents.
///
/// The producer owns the vocabulary, so anything unrecognised is kept as
/// [`NotificationKind::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    EntityStatusChanged,
    EntityListUpdated,
    ConsoleMessageAdded,
    PlayerJoined,
    PlayerLeft,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::EntityStatusChanged => "EntityStatusChanged",
            NotificationKind::EntityListUpdated => "EntityListUpdated",
            NotificationKind::ConsoleMessageAdded => "ConsoleMessageAdded",
            NotificationKind::PlayerJoined => "PlayerJoined",
            NotificationKind::PlayerLeft => "PlayerLeft",
            NotificationKind::Other(name) => name,
        }
    }

    /// Whether this kind is one of the built-in variants.
    pub fn is_known(&self) -> bool {
        !matches!(self, NotificationKind::Other(_))
    }
}

impl From<&str> for NotificationKind {
    fn from(name: &str) -> Self {
        match name {
            "EntityStatusChanged" => NotificationKind::EntityStatusChanged,
            "EntityListUpdated" => NotificationKind::EntityListUpdated,
            "ConsoleMessageAdded" => NotificationKind::ConsoleMessageAdded,
            "PlayerJoined" => NotificationKind::PlayerJoined,
            "PlayerLeft" => NotificationKind::PlayerLeft,
            other => NotificationKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationKind {
    fn from(name: String) -> Self {
        match NotificationKind::from(name.as_str()) {
            NotificationKind::Other(_) => NotificationKind::Other(name),
            known => known,
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// A payload type bound to one notification kind.
pub trait Notification: DeserializeOwned + Send + 'static {
    fn kind() -> NotificationKind;
}

/// One decoded notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(rename = "type")]
    pub kind: NotificationKind,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl NotificationEnvelope {
    pub fn new(kind: impl Into<NotificationKind>, payload: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Decode one reassembled message.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Decode`] if the text is not a JSON object
    /// or lacks a string `"type"` field.
    pub fn decode(text: &str) -> Result<Self, NotificationError> {
        let value: Value = serde_json::from_str(text)?;

        let Value::Object(mut object) = value else {
            return Err(NotificationError::decode(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            )));
        };

        let kind = match object.remove(KIND_FIELD) {
            Some(Value::String(name)) => NotificationKind::from(name),
            Some(other) => {
                return Err(NotificationError::decode(format!(
                    "'{KIND_FIELD}' must be a string, got {}",
                    json_type_name(&other)
                )));
            }
            None => {
                return Err(NotificationError::decode(format!(
                    "missing '{KIND_FIELD}' discriminator"
                )));
            }
        };

        Ok(Self {
            kind,
            payload: object,
        })
    }

    pub fn encode(&self) -> Result<String, NotificationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
