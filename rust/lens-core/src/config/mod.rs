//! Configuration management for the introspection engine.
//!
//! Configuration is layered from defaults, optional config files
//! (`config/runner-lens.{yaml,toml,json}`) and `RUNNER_LENS__*` environment
//! variables, then validated.
//!
//! ```rust,ignore
//! use lens_core::config::LensConfig;
//!
//! let config = LensConfig::load()?;
//! let session = Session::new(config, raw_registry);
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::LensResult;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "RUNNER_LENS";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensConfig {
    /// Telemetry buffer capacities.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Durable flow extraction.
    #[serde(default)]
    pub durable: DurableConfig,
    /// Snapshot and index build behavior.
    #[serde(default)]
    pub introspection: IntrospectionConfig,
    /// Path sanitizing roots.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LensConfig {
    /// Load configuration from environment and config files, then validate.
    pub fn load() -> LensResult<Self> {
        let config = Self::load_unchecked()?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> LensResult<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/runner-lens").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Ring buffer capacities, in entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
    #[serde(default = "default_max_emissions")]
    pub max_emissions: usize,
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
    #[serde(default = "default_max_runs")]
    pub max_runs: usize,
}

fn default_max_logs() -> usize {
    5000
}

fn default_max_emissions() -> usize {
    5000
}

fn default_max_errors() -> usize {
    1000
}

fn default_max_runs() -> usize {
    5000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_logs: default_max_logs(),
            max_emissions: default_max_emissions(),
            max_errors: default_max_errors(),
            max_runs: default_max_runs(),
        }
    }
}

/// Durable flow extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Wall-clock budget per extraction (default: 800ms)
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_extraction_timeout() -> u64 {
    800
}

impl DurableConfig {
    #[must_use]
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extraction_timeout_ms: default_extraction_timeout(),
        }
    }
}

/// Snapshot and index build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    /// Report `MISSING_FILE` for source paths that do not exist.
    #[serde(default = "default_true")]
    pub check_source_files: bool,
    /// Also treat tag ids matching `\btunnel\b` as tunnel tags.
    #[serde(default)]
    pub legacy_tunnel_tag_matching: bool,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            check_source_files: true,
            legacy_tunnel_tag_matching: false,
        }
    }
}

/// A named filesystem root used when sanitizing paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRoot {
    pub name: String,
    pub path: PathBuf,
}

impl NamedRoot {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Path sanitizing roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Add `workspace`, `node_modules` and `home` roots.
    #[serde(default = "default_true")]
    pub include_defaults: bool,
    /// Operator-supplied roots.
    #[serde(default)]
    pub roots: Vec<NamedRoot>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            roots: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = LensConfig::default();
        assert_eq!(config.telemetry.max_logs, 5000);
        assert_eq!(config.telemetry.max_errors, 1000);
        assert_eq!(config.durable.extraction_timeout(), Duration::from_millis(800));
        assert!(config.introspection.check_source_files);
        assert!(!config.introspection.legacy_tunnel_tag_matching);
        assert!(config.paths.include_defaults);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: LensConfig =
            serde_json::from_str(r#"{"telemetry": {"max_runs": 10}, "logging": {"format": "json"}}"#)
                .unwrap();
        assert_eq!(config.telemetry.max_runs, 10);
        assert_eq!(config.telemetry.max_logs, 5000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_load_from_environment() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("RUNNER_LENS__TELEMETRY__MAX_ERRORS", "42");
            std::env::set_var("RUNNER_LENS__DURABLE__EXTRACTION_TIMEOUT_MS", "250");
        }
        let config = LensConfig::load().unwrap();
        // SAFETY: see above.
        unsafe {
            std::env::remove_var("RUNNER_LENS__TELEMETRY__MAX_ERRORS");
            std::env::remove_var("RUNNER_LENS__DURABLE__EXTRACTION_TIMEOUT_MS");
        }

        assert_eq!(config.telemetry.max_errors, 42);
        assert_eq!(config.durable.extraction_timeout_ms, 250);
    }
}
