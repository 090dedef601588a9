//! Error types for the layout engine
//!
//! The simulation itself only fails on lifecycle misuse or out-of-range
//! settings. Numeric degeneracies are corrected in place by the force step
//! and never surface here. Loading settings from disk has its own error type.

use thiserror::Error;

/// Errors raised by the simulation supervisor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// `start()` was called after `kill()`; build a new simulation instead
    #[error("cannot start a killed simulation")]
    Killed,

    /// `update_settings` was given a value the simulation cannot work with;
    /// nothing was applied
    #[error(transparent)]
    InvalidSettings(#[from] InvalidSetting),
}

/// A settings field holds a value the simulation cannot work with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for `{field}`: {reason}")]
pub struct InvalidSetting {
    pub field: &'static str,
    pub reason: String,
}

/// Result type for supervisor operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Errors that can occur while loading a settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file extension is not a supported settings format
    #[error("unsupported settings format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document could not be parsed
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON document could not be parsed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the simulation cannot work with
    #[error(transparent)]
    Invalid(#[from] InvalidSetting),
}

/// Result type for settings loading
pub type ConfigResult<T> = Result<T, ConfigError>;
