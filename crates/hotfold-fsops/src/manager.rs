//! Stage folder operations over a shared [`RemoteStore`].
//!
//! # Design
//! - Every listing passes through one normalisation step before filtering.
//! - Layout creation is best-effort: failures are logged and reported, never fatal.

use std::sync::Arc;

use hotfold_config::{ConnectionConfig, FolderLayout};
use hotfold_store::path::join;
use hotfold_store::{ConnectionParams, DirEntry, EntryKind, RemoteStore};
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};
use crate::filter::unique_variant;

/// Listing record after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name.
    pub name: String,
    /// Entry type; always [`EntryKind::File`] after normalisation.
    pub kind: EntryKind,
    /// Size in bytes.
    pub size: u64,
}

/// Share-relative paths of the four stage folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePaths {
    /// Watched folder.
    pub incoming: String,
    /// Folder holding the file being handled.
    pub processing: String,
    /// Destination for handled files.
    pub success: String,
    /// Destination for quarantined failures.
    pub errors: String,
}

impl StagePaths {
    /// Join each folder name onto `base_path`.
    #[must_use]
    pub fn resolve(base_path: &str, layout: &FolderLayout) -> Self {
        Self {
            incoming: join(base_path, &layout.incoming),
            processing: join(base_path, &layout.processing),
            success: join(base_path, &layout.success),
            errors: join(base_path, &layout.errors),
        }
    }

    /// Stage labels paired with their paths.
    #[must_use]
    pub fn all(&self) -> [(&'static str, &str); 4] {
        [
            ("incoming", self.incoming.as_str()),
            ("processing", self.processing.as_str()),
            ("success", self.success.as_str()),
            ("errors", self.errors.as_str()),
        ]
    }
}

/// Façade over the store used by one engine instance.
#[derive(Clone)]
pub struct FileManager {
    store: Arc<dyn RemoteStore>,
    stages: StagePaths,
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl FileManager {
    /// Bind a store to a set of stage folders.
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>, stages: StagePaths) -> Self {
        Self { store, stages }
    }

    /// Stage folder paths.
    #[must_use]
    pub const fn stages(&self) -> &StagePaths {
        &self.stages
    }

    /// Establish the store connection pool ahead of the first poll.
    ///
    /// # Errors
    ///
    /// Returns the store's connection failure; callers treat it as advisory.
    pub async fn prewarm(&self, connection: &ConnectionConfig) -> FsOpsResult<()> {
        let params = ConnectionParams {
            address: connection.address.clone(),
            username: connection.username.clone(),
            password: connection.password.expose().to_string(),
            pool_size: connection.pool_size,
        };
        self.store
            .connect(&params)
            .await
            .map_err(|source| FsOpsError::store("connect", &connection.address, source))
    }

    /// Create every stage folder, continuing past failures.
    ///
    /// Returns the labels of the stages that could not be created.
    pub async fn ensure_layout(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        for (stage, path) in self.stages.all() {
            if let Err(err) = self.store.mkdir_recursive(path).await {
                warn!(stage, path, error = %err, "failed to create stage folder");
                failed.push(stage);
            }
        }
        failed
    }

    /// List the files in `dir`, normalised to name and size.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing itself fails. Individual entries whose
    /// metadata cannot be resolved are skipped.
    pub async fn list(&self, dir: &str) -> FsOpsResult<Vec<FileEntry>> {
        let raw = self
            .store
            .list(dir)
            .await
            .map_err(|source| FsOpsError::store("list", dir, source))?;
        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            if let Some(normalised) = self.normalise(dir, entry).await {
                entries.push(normalised);
            }
        }
        Ok(entries)
    }

    async fn normalise(&self, dir: &str, entry: DirEntry) -> Option<FileEntry> {
        if entry.kind == EntryKind::Directory {
            return None;
        }
        let size = match entry.size {
            Some(size) => size,
            None => {
                let path = join(dir, &entry.name);
                match self.store.stat(&path).await {
                    Ok(stat) if stat.kind == EntryKind::File => stat.size,
                    Ok(_) => return None,
                    Err(err) => {
                        debug!(path = %path, error = %err, "skipping entry without metadata");
                        return None;
                    }
                }
            }
        };
        Some(FileEntry {
            name: entry.name,
            kind: EntryKind::File,
            size,
        })
    }

    /// Current size of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the object is missing, unreadable, or a directory.
    pub async fn file_size(&self, path: &str) -> FsOpsResult<u64> {
        let stat = self
            .store
            .stat(path)
            .await
            .map_err(|source| FsOpsError::store("stat", path, source))?;
        if stat.kind == EntryKind::Directory {
            return Err(FsOpsError::InvalidInput {
                field: "path",
                reason: "not_a_file",
                value: Some(path.to_string()),
            });
        }
        Ok(stat.size)
    }

    /// Non-overwriting move.
    ///
    /// # Errors
    ///
    /// Returns the store failure; collisions satisfy [`FsOpsError::is_collision`].
    pub async fn move_file(&self, from: &str, to: &str) -> FsOpsResult<()> {
        self.store
            .rename(from, to)
            .await
            .map_err(|source| FsOpsError::store("move", to, source))
    }

    /// Move `from` into `dir` as `name`, falling back to a unique-suffixed
    /// name when the plain move fails for any reason.
    ///
    /// Returns the path the file ended up at.
    ///
    /// # Errors
    ///
    /// Returns the failure of the unique-suffixed attempt.
    pub async fn move_unique(&self, from: &str, dir: &str, name: &str) -> FsOpsResult<String> {
        let target = join(dir, name);
        match self.move_file(from, &target).await {
            Ok(()) => Ok(target),
            Err(err) => {
                let fallback = unique_variant(&target);
                debug!(
                    from,
                    target = %target,
                    fallback = %fallback,
                    error = %err,
                    "plain move failed; retrying with unique name"
                );
                self.move_file(from, &fallback).await?;
                Ok(fallback)
            }
        }
    }

    /// Delete `path` when it exists. Returns whether a delete was issued.
    ///
    /// # Errors
    ///
    /// Returns an error when the existence probe or the delete fails.
    pub async fn delete_if_exists(&self, path: &str) -> FsOpsResult<bool> {
        match self.store.stat(path).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => return Ok(false),
            Err(source) => return Err(FsOpsError::store("stat", path, source)),
        }
        self.store
            .delete(path)
            .await
            .map_err(|source| FsOpsError::store("delete", path, source))?;
        Ok(true)
    }

    /// Whether `path` can currently be opened.
    ///
    /// # Errors
    ///
    /// Returns the store failure when the probe itself fails.
    pub async fn is_accessible(&self, path: &str) -> FsOpsResult<bool> {
        self.store
            .is_accessible(path)
            .await
            .map_err(|source| FsOpsError::store("probe", path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_paths_join_onto_base() {
        let stages = StagePaths::resolve("scans/", &FolderLayout::default());
        assert_eq!(stages.incoming, "scans/incoming");
        assert_eq!(stages.errors, "scans/errors");

        let flat = StagePaths::resolve("", &FolderLayout::default());
        assert_eq!(flat.processing, "processing");
        assert_eq!(flat.all().map(|(stage, _)| stage), [
            "incoming",
            "processing",
            "success",
            "errors"
        ]);
    }
}
