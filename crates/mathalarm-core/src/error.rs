//! Core error types for mathalarm-core.
//!
//! Nothing in here is fatal to the process. Sound failures degrade to a
//! silent alarm, unknown ids are no-ops, and bad time input is rejected
//! before it reaches the scheduler.

use std::path::PathBuf;
use thiserror::Error;

use crate::alarm::AlarmId;

/// Core error type for mathalarm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Alarm lookup / session errors
    #[error("Alarm error: {0}")]
    Alarm(#[from] AlarmError),

    /// Audio player errors
    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors for operations addressed to a specific alarm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlarmError {
    /// The id was never issued or the alarm has been removed.
    #[error("Unknown alarm id: {0}")]
    UnknownAlarm(AlarmId),

    /// The alarm exists but has no open puzzle session.
    #[error("Alarm {0} is not ringing")]
    NoActiveSession(AlarmId),
}

/// Errors reported by a [`Player`](crate::ports::Player) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// The sound asset could not be loaded.
    #[error("Failed to load sound '{sound}': {message}")]
    LoadFailed { sound: String, message: String },

    /// The sound was loaded but playback could not start.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors raised at the UI boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time input that is not a valid `HH:MM`.
    #[error("Invalid time '{input}': {message}")]
    InvalidTime { input: String, message: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
