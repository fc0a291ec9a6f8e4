//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;

use uniseg_core::UnisegError;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The sources could not be merged or extracted.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A conversion or send failed.
    #[error(transparent)]
    Uniseg(#[from] UnisegError),

    /// No builder or exporter registered for a platform.
    #[error("Platform not registered: {0}")]
    PlatformNotFound(String),

    /// Bot already exists.
    #[error("Bot already exists: {0}")]
    BotExists(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
