pub mod config;
pub mod handler;
pub mod notification;

pub use config::ConfigError;
pub use handler::HandlerError;
pub use notification::NotificationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
