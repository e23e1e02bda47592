use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum NotificationError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Stopped Error: {message} {location}")]
    Stopped {
        message: String,
        location: ErrorLocation,
    },
}

impl NotificationError {
    #[track_caller]
    pub fn not_connected() -> Self {
        NotificationError::NotConnected {
            message: String::from("notification channel is not connected"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        NotificationError::Decode {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn stopped() -> Self {
        NotificationError::Stopped {
            message: String::from("notification supervisor has stopped"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for NotificationError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        NotificationError::Decode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
