//! Error types for configuration management.

use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// Invalid TOML in configuration file.
    #[error("Invalid TOML in {file}: {error}")]
    InvalidToml {
        /// The file path.
        file: String,
        /// The error message.
        error: String,
    },

    /// A configuration value failed validation.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Environment override could not be parsed.
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue {
        /// The environment variable name.
        var: String,
        /// The offending value.
        value: String,
    },

    /// File watcher error.
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConfigError::FileNotFound(_) => StatusCode::ConfigFileError,
            ConfigError::InvalidToml { .. } => StatusCode::ConfigFileError,
            ConfigError::Invalid(_) => StatusCode::InvalidConfig,
            ConfigError::InvalidEnvValue { .. } => StatusCode::InvalidConfig,
            ConfigError::Watcher(_) => StatusCode::Internal,
            ConfigError::Io(_) => StatusCode::IoError,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
