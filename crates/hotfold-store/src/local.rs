//! Store backend for shares mounted into the local filesystem (CIFS/NFS mounts,
//! or a plain directory during development).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::model::{ConnectionParams, DirEntry, EntryKind, ObjectStat, RemoteStore};
use crate::path::segments;

/// [`RemoteStore`] rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`. The directory is checked on `connect`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory backing the share.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a share-relative path onto the local root.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` for paths containing `..`.
    pub fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let parts = segments(path).ok_or_else(|| StoreError::InvalidPath {
            path: path.to_string(),
            reason: "parent_segment",
        })?;
        let mut resolved = self.root.clone();
        resolved.extend(parts);
        Ok(resolved)
    }

    async fn kind_of(&self, path: &str, local: &Path) -> StoreResult<EntryKind> {
        let meta = fs::metadata(local)
            .await
            .map_err(|err| StoreError::from_io("metadata", path, err))?;
        Ok(if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn connect(&self, params: &ConnectionParams) -> StoreResult<()> {
        let meta = fs::metadata(&self.root).await.map_err(|err| {
            StoreError::from_io("connect", &self.root.display().to_string(), err)
        })?;
        if !meta.is_dir() {
            return Err(StoreError::Transport {
                operation: "connect",
                path: self.root.display().to_string(),
                detail: "share root is not a directory".to_string(),
            });
        }
        debug!(
            address = %params.address,
            pool_size = params.pool_size,
            "local share root available"
        );
        Ok(())
    }

    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
        let local = self.resolve(path)?;
        let mut reader = fs::read_dir(&local)
            .await
            .map_err(|err| StoreError::from_io("read_dir", path, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| StoreError::from_io("read_dir", path, err))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(meta) = entry.metadata().await else {
                // Vanished between listing and metadata; report it without a size
                // and let the caller decide.
                entries.push(DirEntry {
                    name,
                    kind: EntryKind::File,
                    size: None,
                });
                continue;
            };
            if meta.is_dir() {
                entries.push(DirEntry::directory(name));
            } else {
                entries.push(DirEntry::file(name, meta.len()));
            }
        }
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> StoreResult<ObjectStat> {
        let local = self.resolve(path)?;
        let meta = fs::metadata(&local)
            .await
            .map_err(|err| StoreError::from_io("stat", path, err))?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(ObjectStat {
            kind,
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        self.kind_of(from, &source).await?;
        // Check-then-rename: good enough for a single poller per tree.
        if fs::try_exists(&target)
            .await
            .map_err(|err| StoreError::from_io("rename", to, err))?
        {
            return Err(StoreError::AlreadyExists {
                path: to.to_string(),
            });
        }
        fs::rename(&source, &target)
            .await
            .map_err(|err| StoreError::from_io("rename", to, err))
    }

    async fn mkdir_recursive(&self, path: &str) -> StoreResult<()> {
        let local = self.resolve(path)?;
        fs::create_dir_all(&local)
            .await
            .map_err(|err| StoreError::from_io("mkdir", path, err))
    }

    async fn read_all(&self, path: &str) -> StoreResult<Vec<u8>> {
        let local = self.resolve(path)?;
        fs::read(&local)
            .await
            .map_err(|err| StoreError::from_io("read", path, err))
    }

    async fn write_all(&self, path: &str, data: &[u8]) -> StoreResult<u64> {
        let local = self.resolve(path)?;
        fs::write(&local, data)
            .await
            .map_err(|err| StoreError::from_io("write", path, err))?;
        Ok(data.len() as u64)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let local = self.resolve(path)?;
        let kind = match self.kind_of(path, &local).await {
            Ok(kind) => kind,
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        };
        let result = match kind {
            EntryKind::Directory => fs::remove_dir(&local).await,
            EntryKind::File => fs::remove_file(&local).await,
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::from_io("delete", path, err)),
        }
    }

    async fn is_accessible(&self, path: &str) -> StoreResult<bool> {
        let local = self.resolve(path)?;
        fs::try_exists(&local)
            .await
            .map_err(|err| StoreError::from_io("exists", path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn params() -> ConnectionParams {
        ConnectionParams {
            address: "local".into(),
            username: "guest".into(),
            password: String::new(),
            pool_size: 1,
        }
    }

    #[test]
    fn resolve_rejects_parent_segments() {
        let store = LocalStore::new("/srv/share");
        assert!(matches!(
            store.resolve("in/../../etc/passwd"),
            Err(StoreError::InvalidPath { .. })
        ));
        let resolved = store.resolve("/in/a.txt").map(|p| p.ends_with("in/a.txt"));
        assert!(matches!(resolved, Ok(true)));
    }

    #[tokio::test]
    async fn connect_requires_directory_root() -> Result<()> {
        let temp = tempfile::tempdir()?;
        LocalStore::new(temp.path()).connect(&params()).await?;

        let missing = LocalStore::new(temp.path().join("missing"));
        assert!(missing.connect(&params()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn delete_of_missing_object_succeeds() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalStore::new(temp.path());
        store.delete("nothing-here.txt").await?;
        Ok(())
    }
}
