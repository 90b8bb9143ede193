//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A filter pattern did not compile.
    #[error("invalid filter pattern")]
    InvalidPattern {
        /// Field holding the pattern.
        field: &'static str,
        /// Pattern source text.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Reading the configuration document failed.
    #[error("failed to read configuration")]
    Io {
        /// Document path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration document could not be parsed.
    #[error("failed to parse configuration")]
    Parse {
        /// Document path, if the document came from disk.
        path: Option<PathBuf>,
        /// Source parse error.
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: Some(value.to_string()),
            reason,
        }
    }

    /// Machine-readable reason for field failures.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Field name the error relates to, when there is one.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } | Self::InvalidPattern { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
