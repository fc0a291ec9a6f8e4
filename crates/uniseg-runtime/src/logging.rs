//! Subscriber setup for `tracing`.
//!
//! ```rust,ignore
//! use uniseg_runtime::{config::ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! `RUST_LOG`, when set, replaces the configured base level. Per-module
//! filters are added on top in both cases.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// Installs the subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builds the global subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    level: LogLevel,
    format: LogFormat,
    directives: Vec<String>,
    file: Option<PathBuf>,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level,
            format: config.format,
            directives: config
                .filters
                .iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            file: config.file.clone(),
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Adds a filter directive such as `uniseg_core=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Writes log lines to `path` instead of stdout.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Directives handed to the filter, base level first.
    pub fn directives(&self) -> Vec<String> {
        std::iter::once(self.level.to_string())
            .chain(self.directives.iter().cloned())
            .collect()
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, then reports directives that did not parse.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.build_filter();
        let result = match &self.file {
            Some(path) => self.install(filter, file_writer(path)),
            None => self.install(filter, std::io::stdout),
        };
        if result.is_ok() {
            for directive in rejected {
                warn!(directive = %directive, "Ignoring invalid log directive");
            }
        }
        result
    }

    fn build_filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        let mut rejected = Vec::new();
        for directive in &self.directives {
            match directive.parse::<Directive>() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => rejected.push(directive.clone()),
            }
        }
        (filter, rejected)
    }

    fn install<W>(&self, filter: EnvFilter, writer: W) -> Result<(), TryInitError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(writer))
                .try_init(),
            LogFormat::Full => registry.with(fmt::layer().with_writer(writer)).try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(writer))
                .try_init(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(writer))
                .try_init(),
        }
    }
}

fn file_writer(path: &Path) -> RollingFileAppender {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or(OsStr::new("uniseg.log"));
    rolling::never(dir, name)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_from_config_directives() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filters: BTreeMap::from([
                ("uniseg_core".to_string(), LogLevel::Trace),
                ("figment".to_string(), LogLevel::Error),
            ]),
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(
            builder.directives(),
            vec!["warn", "figment=error", "uniseg_core=trace"]
        );
    }

    #[test]
    fn test_invalid_directive_collected() {
        let (_, rejected) = LoggingBuilder::new()
            .directive("uniseg_core=debug")
            .directive("uniseg_core=loudest")
            .build_filter();
        assert_eq!(rejected, vec!["uniseg_core=loudest"]);
    }
}
