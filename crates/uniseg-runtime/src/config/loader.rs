//! Layered configuration loading.
//!
//! Sources are merged lowest to highest:
//!
//! 1. Built-in defaults
//! 2. `uniseg.{toml,yaml,yml}` (or the file given to [`ConfigLoader::file`])
//! 3. The profile companion next to it, e.g. `uniseg.production.toml`
//! 4. `UNISEG_*` environment variables, with `__` between keys
//! 5. Values given to [`ConfigLoader::merge`] and [`ConfigLoader::set`]
//!
//! ```rust,ignore
//! use uniseg_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/uniseg.toml")
//!     .set("logging.level", "debug")
//!     .load()?;
//! ```
//!
//! `UNISEG_CONVERT__FALLBACK=ignore` sets `convert.fallback`.

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::schema::UnisegConfig;
use super::validation::validate_config;
use crate::error::{ConfigError, ConfigResult};

const ENV_PREFIX: &str = "UNISEG_";
const DEFAULT_PROFILE: &str = "development";

const EXTENSIONS: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "toml",
    #[cfg(feature = "yaml-config")]
    "yaml",
    #[cfg(feature = "yaml-config")]
    "yml",
];

/// Builder that gathers configuration sources and extracts a validated
/// [`UnisegConfig`].
pub struct ConfigLoader {
    profile: String,
    file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// The profile comes from `UNISEG_PROFILE`, falling back to `development`.
    pub fn new() -> Self {
        let profile = std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        Self {
            profile: profile.to_lowercase(),
            file: None,
            search_paths: Vec::new(),
            env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into().to_lowercase();
        self
    }

    /// Directory searched for `uniseg.*`. Defaults to the working directory
    /// and the user config dir.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Loads this file instead of searching. Missing files are an error.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merges a serializable value over every other source.
    ///
    /// Only the keys present in `overrides` take effect, so partial values
    /// such as `serde_json::json!({"logging": {"level": "debug"}})` work.
    pub fn merge(mut self, overrides: impl Serialize) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(overrides));
        self
    }

    /// Sets a single dotted key over every other source.
    pub fn set(mut self, key: &str, value: impl Serialize) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    pub fn load(self) -> ConfigResult<UnisegConfig> {
        let mut figment = Figment::from(Serialized::defaults(UnisegConfig::default()));

        match self.base_file()? {
            Some(base) => {
                info!(path = %base.display(), "Loading configuration file");
                figment = merge_file(figment, &base)?;
                if let Some(companion) = self.profile_file(&base) {
                    debug!(path = %companion.display(), profile = %self.profile, "Loading profile configuration");
                    figment = merge_file(figment, &companion)?;
                }
            }
            None => warn!(profile = %self.profile, "No configuration file found, using defaults"),
        }

        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        figment = figment.merge(self.overrides);

        let config: UnisegConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            profile = %self.profile,
            level = %config.logging.level,
            fallback = ?config.convert.fallback,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn base_file(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(file) = &self.file {
            if !file.exists() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
            return Ok(Some(file.clone()));
        }
        let found = self.search_dirs().into_iter().find_map(|dir| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("uniseg.{ext}")))
                .find(|path| path.exists())
        });
        Ok(found)
    }

    /// `dir/stem.{profile}.ext` for a base file `dir/stem.ext`.
    fn profile_file(&self, base: &Path) -> Option<PathBuf> {
        let stem = base.file_stem()?.to_str()?;
        let ext = base.extension()?.to_str()?;
        let path = base.with_file_name(format!("{stem}.{}.{ext}", self.profile));
        path.exists().then_some(path)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("uniseg")))
            .collect()
    }
}

#[allow(unused_variables)]
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "unsupported configuration format: .{ext}"
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use figment::Jail;
    use serde_json::json;
    use uniseg_core::FallbackPolicy;

    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Info);
            assert_eq!(config.convert.cache_capacity, 20);
            assert_eq!(config.convert.fallback, FallbackPolicy::Text);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("UNISEG_LOGGING__LEVEL", "debug");
            jail.set_env("UNISEG_CONVERT__FALLBACK", "ignore");
            jail.set_env("UNISEG_CONVERT__CACHE_CAPACITY", "64");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.convert.fallback, FallbackPolicy::Ignore);
            assert_eq!(config.convert.cache_capacity, 64);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_and_profile() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "uniseg.toml",
                r#"
                [convert]
                fallback = "forbid"
                api_timeout_secs = 5
                "#,
            )?;
            jail.create_file(
                "uniseg.production.toml",
                r#"
                [logging]
                level = "warn"
                "#,
            )?;
            let config = ConfigLoader::new()
                .profile("Production")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.convert.fallback, FallbackPolicy::Forbid);
            assert_eq!(config.convert.api_timeout_secs, 5);
            assert_eq!(config.logging.level, LogLevel::Warn);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_overrides_beat_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "uniseg.toml",
                "[logging]\nlevel = \"warn\"\n[convert]\nfallback = \"forbid\"\n",
            )?;
            let config = ConfigLoader::new()
                .file("uniseg.toml")
                .without_env()
                .set("logging.level", "debug")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.convert.fallback, FallbackPolicy::Forbid);
            Ok(())
        });
    }

    #[test]
    fn test_overrides_beat_env() {
        Jail::expect_with(|jail| {
            jail.set_env("UNISEG_LOGGING__LEVEL", "error");
            jail.set_env("UNISEG_CONVERT__CACHE_CAPACITY", "64");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(json!({ "logging": { "level": "trace" } }))
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Trace);
            assert_eq!(config.convert.cache_capacity, 64);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_value_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("uniseg.toml", "[convert]\ncache_capacity = 0\n")?;
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/definitely/not/here/uniseg.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_profile_file_name() {
        let loader = ConfigLoader::new().profile("staging");
        Jail::expect_with(|jail| {
            jail.create_file("uniseg.staging.toml", "")?;
            let base = jail.directory().join("uniseg.toml");
            assert_eq!(
                loader.profile_file(&base),
                Some(jail.directory().join("uniseg.staging.toml"))
            );
            Ok(())
        });
    }
}
