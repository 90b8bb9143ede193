//! # Design
//!
//! - Constant error messages; the offending path and operation travel as fields.
//! - Naming collisions get their own variants so callers can route them without
//!   string matching.

use std::io;

use thiserror::Error;

/// Result alias for remote store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a [`crate::RemoteStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("remote object not found")]
    NotFound {
        /// Share-relative path of the missing object.
        path: String,
    },
    /// A non-overwriting rename hit an occupied destination.
    #[error("remote object name collision")]
    AlreadyExists {
        /// Destination that is still occupied.
        path: String,
    },
    /// The destination is occupied by an object awaiting deletion.
    #[error("remote object delete pending")]
    DeletePending {
        /// Path of the delete-pending object.
        path: String,
    },
    /// A directory could not be removed because it still has children.
    #[error("remote directory not empty")]
    DirectoryNotEmpty {
        /// Directory path.
        path: String,
    },
    /// The supplied path cannot be mapped onto the share.
    #[error("invalid remote path")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// Local IO failed while serving the request.
    #[error("remote store io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The transport reported a failure that is neither a collision nor a
    /// missing object.
    #[error("remote store transport failure")]
    Transport {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: String,
        /// Transport-provided detail.
        detail: String,
    },
}

impl StoreError {
    /// Whether the error is the "destination still occupied" class.
    #[must_use]
    pub const fn is_collision(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::DeletePending { .. })
    }

    /// Whether the error reports a missing object.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map an IO error onto the store taxonomy.
    pub(crate) fn from_io(operation: &'static str, path: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_string(),
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.to_string(),
            },
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty {
                path: path.to_string(),
            },
            _ => Self::Io {
                operation,
                path: path.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_errors_map_onto_store_variants() {
        let missing = StoreError::from_io("stat", "a/b", io::Error::from(io::ErrorKind::NotFound));
        assert!(missing.is_not_found());

        let taken = StoreError::from_io(
            "rename",
            "a/b",
            io::Error::from(io::ErrorKind::AlreadyExists),
        );
        assert!(taken.is_collision());

        let other = StoreError::from_io("read", "a/b", io::Error::other("boom"));
        assert!(matches!(other, StoreError::Io { .. }));
        assert!(other.source().is_some());
    }

    #[test]
    fn collision_messages_stay_recognisable() {
        let err = StoreError::AlreadyExists {
            path: "success/a.txt".into(),
        };
        assert_eq!(err.to_string(), "remote object name collision");
        let pending = StoreError::DeletePending {
            path: "success/a.txt".into(),
        };
        assert!(pending.is_collision());
    }
}
