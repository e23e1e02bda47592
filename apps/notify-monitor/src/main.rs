use notify_monitor::error::MonitorError;
use notify_monitor::logger::initialize as LoggerInitialize;
use notify_monitor::monitor;

use notification_core::config::default_config_dir;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::{error, info};

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    let config_dir = default_config_dir().map_err(|e| MonitorError::Core {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    let log_dir = config_dir.join("logs");

    create_dir_all(&log_dir).map_err(|e| MonitorError::Monitor {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Notification monitor starting");
    info!("Config directory: {}", config_dir.display());

    let result = monitor::run(&config_dir, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    })
    .await;

    match &result {
        Ok(()) => info!("Notification monitor stopped"),
        Err(e) => error!("Notification monitor failed: {e}"),
    }
    result
}
