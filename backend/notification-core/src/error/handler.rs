use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failure reported by a notification or status callback.
#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("Handler Error: {message} {location}")]
    Failed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Payload Error: {kind}: {message} {location}")]
    Payload {
        kind: String,
        message: String,
        location: ErrorLocation,
    },
}

impl HandlerError {
    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn payload(kind: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Payload {
            kind: kind.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
