//! # Design
//!
//! - Constant messages; paths and operations travel as fields.
//! - Store failures keep their source so collisions stay distinguishable.

use hotfold_store::StoreError;
use thiserror::Error;

/// Result type for stage-folder operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while selecting or moving files.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The remote store rejected an operation.
    #[error("fsops store failure")]
    Store {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// A filter pattern failed to compile.
    #[error("fsops pattern failure")]
    Pattern {
        /// Filter field carrying the pattern.
        field: &'static str,
        /// Pattern that failed to compile.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn store(operation: &'static str, path: &str, source: StoreError) -> Self {
        Self::Store {
            operation,
            path: path.to_string(),
            source,
        }
    }

    /// Whether the failure is a destination-occupied collision.
    #[must_use]
    pub const fn is_collision(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_collision(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn store_errors_keep_collision_class_and_source() {
        let err = FsOpsError::store(
            "move",
            "hot/success/a.txt",
            StoreError::AlreadyExists {
                path: "hot/success/a.txt".into(),
            },
        );
        assert!(err.is_collision());
        assert_eq!(err.to_string(), "fsops store failure");
        assert!(err.source().is_some());

        let other = FsOpsError::InvalidInput {
            field: "path",
            reason: "not_a_file",
            value: None,
        };
        assert!(!other.is_collision());
    }
}
