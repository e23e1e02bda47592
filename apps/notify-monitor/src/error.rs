use common::ErrorLocation;

use thiserror::Error;

/// Errors that stop the monitor process.
///
/// Failures inside the notification pipeline never surface here; the
/// supervisor logs and retries them. These are startup and shutdown failures.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Error from this App
    #[error("Monitor Error: {message} {location}")]
    Monitor {
        message: String,
        location: ErrorLocation,
    },

    /// Error from notification-core (config, credential, supervisor)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}
