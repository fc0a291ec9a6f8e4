//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uniseg_core::FallbackPolicy;
use uniseg_core::cache::DEFAULT_CAPACITY;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnisegConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Conversion settings shared by every platform.
    #[serde(default)]
    pub convert: ConvertConfig,
}

// =============================================================================
// Conversion
// =============================================================================

/// Conversion and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Policy for segments a platform cannot express.
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Drop leading/trailing whitespace-only text when building.
    #[serde(default = "default_true")]
    pub strip_whitespace: bool,

    /// Entries kept by adapters' message-fetch caches.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// How long a platform API call may take, in seconds.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl ConvertConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            strip_whitespace: true,
            cache_capacity: default_cache_capacity(),
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_api_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    /// Write to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Per-module levels, e.g. `uniseg_core = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}
