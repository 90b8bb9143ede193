//! Listing records and the remote store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Object type reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Raw directory listing entry.
///
/// Transports differ in how much metadata they return with a listing; `size`
/// is `None` when the transport only reports names and types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name without its parent path.
    pub name: String,
    /// Entry type.
    pub kind: EntryKind,
    /// Size in bytes when the listing carries it.
    pub size: Option<u64>,
}

impl DirEntry {
    /// Entry with a known size.
    #[must_use]
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    /// Directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: None,
        }
    }
}

/// Extended metadata for a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStat {
    /// Object type.
    pub kind: EntryKind,
    /// End-of-file position in bytes (zero for directories).
    pub size: u64,
    /// Last write time when known.
    pub modified: Option<DateTime<Utc>>,
}

/// Credentials and pool sizing used to (re)establish store connections.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Store address, e.g. `\\host\share` or a mount point.
    pub address: String,
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Number of pooled connections to keep.
    pub pool_size: usize,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"***")
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Operations the pipeline needs from a remote file store.
///
/// Paths are share-relative and use `/` as separator. Implementations may be
/// pooled and are shared by every operation one engine issues.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Establish (or confirm) the connection pool. Safe to call repeatedly.
    async fn connect(&self, params: &ConnectionParams) -> StoreResult<()>;

    /// List the direct children of `path`.
    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>>;

    /// Fetch metadata for `path`; missing objects yield `StoreError::NotFound`.
    async fn stat(&self, path: &str) -> StoreResult<ObjectStat>;

    /// Non-overwriting rename. An occupied destination yields a collision
    /// error (`StoreError::is_collision`).
    async fn rename(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Create `path` and any missing parents; existing directories are fine.
    async fn mkdir_recursive(&self, path: &str) -> StoreResult<()>;

    /// Read the full contents of a file.
    async fn read_all(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Create or truncate a file and write `data`, returning bytes written.
    async fn write_all(&self, path: &str, data: &[u8]) -> StoreResult<u64>;

    /// Delete a file or an empty directory. Deleting a missing object succeeds.
    ///
    /// Stores with delete-on-close semantics may keep the name visible after
    /// this returns.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Whether `path` can currently be opened.
    async fn is_accessible(&self, path: &str) -> StoreResult<bool>;
}
