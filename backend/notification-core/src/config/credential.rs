//! Handshake credential loading.
//!
//! The token is read from an environment variable, optionally populated from
//! a `.env` file next to the working directory or the executable.

use super::HandshakeConfig;
use crate::error::config::ConfigError;

use common::{ErrorLocation, RedactedToken};

use std::env;
use std::panic::Location;
use std::path::PathBuf;

use log::{debug, info, warn};

/// Result of attempting to load a .env file.
#[derive(Debug)]
pub struct EnvLoadResult {
    /// The `.env` file that was applied, if any.
    pub path: Option<PathBuf>,
}

/// Load the handshake token named by `config.token_env`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] if the variable is unset,
/// empty, or not valid unicode.
pub fn load_handshake_token(config: &HandshakeConfig) -> Result<RedactedToken, ConfigError> {
    match try_load_dotenv().path {
        Some(path) => debug!("Reading {} after applying {}", config.token_env, path.display()),
        None => debug!("No .env file found - checking existing environment variables"),
    }

    let missing = || ConfigError::MissingCredential {
        location: ErrorLocation::from(Location::caller()),
        env_var: config.token_env.clone(),
    };

    match env::var(&config.token_env) {
        Ok(value) => {
            let token = RedactedToken::new(value);
            if token.is_blank() {
                warn!("{} is set but empty", config.token_env);
                return Err(missing());
            }
            info!(
                "Loaded handshake token from {} ({} chars)",
                config.token_env,
                token.len()
            );
            Ok(token)
        }
        Err(env::VarError::NotPresent) => Err(missing()),
        Err(env::VarError::NotUnicode(_)) => {
            warn!("Env var {} contains invalid unicode", config.token_env);
            Err(missing())
        }
    }
}

/// Attempts to load .env from known locations.
fn try_load_dotenv() -> EnvLoadResult {
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded .env from: {:?}", path);
        return EnvLoadResult { path: Some(path) };
    }

    if let Ok(exe_path) = env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let env_path = exe_dir.join(".env");
        if env_path.exists() {
            match dotenvy::from_path(&env_path) {
                Ok(()) => {
                    info!("Loaded .env from: {:?}", env_path);
                    return EnvLoadResult {
                        path: Some(env_path),
                    };
                }
                Err(e) => warn!("Failed to parse .env at {:?}: {}", env_path, e),
            }
        }
    }

    EnvLoadResult { path: None }
}
