//! Handle to a spawned supervisor task.

use crate::error::NotificationError;

use common::ErrorLocation;

use std::panic::Location;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Returned by [`NotificationClient::start`](super::NotificationClient::start).
///
/// Dropping the handle does not stop the supervisor; call
/// [`shutdown`](Self::shutdown) or cancel through the client.
pub struct SupervisorHandle {
    pub(crate) task: JoinHandle<()>,
    pub(crate) cancel: CancellationToken,
}

impl SupervisorHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the supervisor and wait for its task to exit.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Stopped`] if the task panicked.
    pub async fn shutdown(self) -> Result<(), NotificationError> {
        self.cancel.cancel();
        self.task.await.map_err(|e| NotificationError::Stopped {
            message: format!("Supervisor task failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
