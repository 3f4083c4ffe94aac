//! Layered configuration for the call-coaching audio engine.
//!
//! Settings are assembled from, in increasing priority:
//! 1. Compiled-in defaults ([`constants`])
//! 2. An optional `config/default.toml` / `config/{env}.toml` file
//! 3. `CALLCOACH_`-prefixed environment variables

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, CacheConfig, CadenceConfig, HarmonicConfig, MfccConfig, ObservabilityConfig,
    PathsConfig, PitchConfig, RuntimeEnvironment, SessionConfig, Settings, VadConfig,
};

use thiserror::Error;

/// Errors raised while building or validating [`Settings`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
