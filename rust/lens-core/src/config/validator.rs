//! Configuration validation.
//!
//! Every rule is checked and all failures are reported together.

use std::collections::HashSet;

use super::error::{ConfigResult, ConfigurationError};
use super::{LensConfig, PathsConfig, TelemetryConfig};
use crate::paths::DEFAULT_ROOT_NAMES;

const MAX_EXTRACTION_TIMEOUT_MS: u64 = 60_000;

/// Configuration validator.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration.
    pub fn validate(config: &LensConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_telemetry(&config.telemetry) {
            errors.push(e);
        }

        let timeout = config.durable.extraction_timeout_ms;
        if timeout == 0 || timeout > MAX_EXTRACTION_TIMEOUT_MS {
            errors.push(ConfigurationError::invalid(
                format!("durable.extraction_timeout_ms is {timeout}"),
                format!("Use a value between 1 and {MAX_EXTRACTION_TIMEOUT_MS}"),
            ));
        }

        if let Err(e) = Self::validate_paths(&config.paths) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }

    /// Every buffer must hold at least one entry.
    pub fn validate_telemetry(config: &TelemetryConfig) -> ConfigResult<()> {
        let capacities = [
            ("telemetry.max_logs", config.max_logs),
            ("telemetry.max_emissions", config.max_emissions),
            ("telemetry.max_errors", config.max_errors),
            ("telemetry.max_runs", config.max_runs),
        ];

        let mut errors: Vec<_> = capacities
            .iter()
            .filter(|(_, capacity)| *capacity == 0)
            .map(|(name, _)| {
                ConfigurationError::invalid(format!("{name} is 0"), "Use a value >= 1")
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }

    /// Root names must be unique and must not shadow the default roots.
    pub fn validate_paths(config: &PathsConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for root in &config.roots {
            if root.name.is_empty() || root.name.contains(':') {
                errors.push(ConfigurationError::invalid(
                    format!("paths.roots name '{}' is not a valid label", root.name),
                    "Use a non-empty name without ':'",
                ));
            }
            if !root.path.is_absolute() {
                errors.push(ConfigurationError::invalid(
                    format!("paths.roots '{}' is not absolute: {}", root.name, root.path.display()),
                    "Use an absolute path",
                ));
            }
            if !seen.insert(root.name.as_str()) {
                errors.push(ConfigurationError::invalid(
                    format!("paths.roots name '{}' is used twice", root.name),
                    "Give every root a distinct name",
                ));
            }
            if config.include_defaults && DEFAULT_ROOT_NAMES.contains(&root.name.as_str()) {
                errors.push(ConfigurationError::incompatible(
                    format!("paths.roots '{}'", root.name),
                    "paths.include_defaults = true",
                    "the name is reserved for a default root",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }
}
