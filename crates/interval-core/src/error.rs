//! Core error types for interval-core.
//!
//! Only [`CoreError::InvalidConfig`] is allowed to halt the core. The
//! collaborator variants (`Persistence`, `Scheduling`, `Playback`) are
//! produced by capability implementations and swallowed by the run
//! controller at the call site.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for interval-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A timeline parameter was zero.
    #[error("Invalid timeline parameter '{field}': {value} (must be positive)")]
    InvalidConfig { field: &'static str, value: u64 },

    /// Saving, loading or clearing the persisted run failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Scheduling or cancelling a background cue failed
    #[error("Scheduling failure: {0}")]
    Scheduling(String),

    /// Playing an audio cue failed
    #[error("Playback failure: {0}")]
    Playback(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_names_the_field() {
        let err = CoreError::InvalidConfig {
            field: "reps",
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid timeline parameter 'reps': 0 (must be positive)"
        );
    }

    #[test]
    fn config_error_converts_into_core_error() {
        let err: CoreError = ConfigError::InvalidValue {
            key: "timer.tick_interval_ms".into(),
            message: "must be greater than zero".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
