//! Configuration module for the Uniseg runtime.
//!
//! Settings are layered with figment from defaults, `uniseg.toml`,
//! `UNISEG_*` environment variables and programmatic overrides, then
//! validated.

pub mod loader;
pub mod schema;
pub mod validation;

pub use crate::error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{ConvertConfig, LogFormat, LogLevel, LoggingConfig, UnisegConfig};
pub use validation::validate_config;
