use thiserror::Error;

use crate::config::ConfigurationError;

/// Error type for the fallible loading paths of the introspection engine.
///
/// Queries never produce this: unknown ids resolve to `None` or an empty list.
#[derive(Error, Debug)]
pub enum LensError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A registry manifest could not be decoded
    #[error("Invalid registry manifest: {0}")]
    InvalidManifest(String),

    /// A coverage report could not be decoded
    #[error("Invalid coverage report: {0}")]
    InvalidCoverage(String),

    #[error("Failed to read '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Generic errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for loading operations
pub type LensResult<T> = Result<T, LensError>;

impl From<config::ConfigError> for LensError {
    fn from(err: config::ConfigError) -> Self {
        LensError::Configuration(ConfigurationError::invalid(
            err.to_string(),
            "Check config/runner-lens.* and RUNNER_LENS__* environment variables",
        ))
    }
}

impl LensError {
    pub fn read(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        LensError::Read {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}
