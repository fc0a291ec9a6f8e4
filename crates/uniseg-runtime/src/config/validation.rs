//! Configuration validation utilities.

use super::schema::{ConvertConfig, LoggingConfig, UnisegConfig};
use crate::error::{ConfigError, ConfigResult};

/// Validates the entire configuration.
pub fn validate_config(config: &UnisegConfig) -> ConfigResult<()> {
    validate_convert_config(&config.convert)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_convert_config(convert: &ConvertConfig) -> ConfigResult<()> {
    if convert.cache_capacity == 0 {
        return Err(ConfigError::validation(
            "convert.cache_capacity must be greater than 0",
        ));
    }

    if convert.api_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "convert.api_timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if let Some(file) = &logging.file
        && file.file_name().is_none()
    {
        return Err(ConfigError::validation(format!(
            "logging.file must name a file, got {}",
            file.display()
        )));
    }

    for module in logging.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {module:?}"
            )));
        }
    }

    Ok(())
}
