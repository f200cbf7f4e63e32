//! Configuration error types with actionable user messages.

use std::fmt;

/// Configuration errors with detailed, actionable messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    Invalid {
        /// What is wrong.
        message: String,
        /// How to fix it.
        fix_hint: String,
    },
    /// Two settings that cannot be used together.
    Incompatible {
        setting1: String,
        setting2: String,
        reason: String,
    },
    /// Multiple errors occurred.
    Multiple(Vec<ConfigurationError>),
}

impl std::error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { message, fix_hint } => {
                write!(
                    f,
                    "Invalid configuration: {message}\n\nHow to fix: {fix_hint}"
                )
            }
            Self::Incompatible {
                setting1,
                setting2,
                reason,
            } => {
                write!(
                    f,
                    "Incompatible settings: {setting1} cannot be used with {setting2}\n\n\
                    Reason: {reason}"
                )
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple configuration errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "\n{}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl ConfigurationError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }

    /// Create an incompatible settings error.
    #[must_use]
    pub fn incompatible(
        setting1: impl Into<String>,
        setting2: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Incompatible {
            setting1: setting1.into(),
            setting2: setting2.into(),
            reason: reason.into(),
        }
    }

    /// Aggregate several errors, flattening nested aggregates.
    #[must_use]
    pub fn multiple(errors: Vec<ConfigurationError>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                Self::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::Multiple(flat)
    }

    /// Number of individual errors represented.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display() {
        let err = ConfigurationError::invalid("telemetry.max_logs is 0", "Use a value >= 1");
        let text = err.to_string();
        assert!(text.contains("telemetry.max_logs is 0"));
        assert!(text.contains("How to fix: Use a value >= 1"));
    }

    #[test]
    fn test_multiple_flattens() {
        let err = ConfigurationError::multiple(vec![
            ConfigurationError::invalid("a", "fix a"),
            ConfigurationError::multiple(vec![
                ConfigurationError::invalid("b", "fix b"),
                ConfigurationError::invalid("c", "fix c"),
            ]),
        ]);
        assert_eq!(err.count(), 3);
        assert!(err.to_string().starts_with("Multiple configuration errors:"));
    }
}
