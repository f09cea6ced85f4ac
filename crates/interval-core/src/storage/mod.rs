mod config;
pub mod run_store;

pub use config::{Config, LoggingConfig, NotificationsConfig, TimerConfig};
pub use run_store::{JsonFileRunStore, MemoryRunStore, PersistedRunConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/interval-timer[-dev]/` based on INTERVAL_ENV.
///
/// Set INTERVAL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("INTERVAL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("interval-timer-dev")
    } else {
        base_dir.join("interval-timer")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
