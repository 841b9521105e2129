mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, NotificationsConfig, SessionConfig, ZonesConfig};
pub use database::{Database, Stats};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/pomozone[-dev]/` based on POMOZONE_ENV.
///
/// Set POMOZONE_ENV=dev to use the development data directory, or
/// POMOZONE_HOME to use an explicit directory (tests use this).
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOZONE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOZONE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomozone-dev")
            } else {
                base_dir.join("pomozone")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
