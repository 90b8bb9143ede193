//! Test fixtures and filesystem helpers.

use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Fresh temporary directory removed on drop.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("hotfold-")
        .tempdir()
        .context("failed to create temporary directory")
}

/// Write `contents` to `relative` under `root`, creating parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> Result<()> {
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, contents)
        .with_context(|| format!("failed to write {}", target.display()))
}

/// Sorted file names directly under `root/relative`; empty when the directory is missing.
///
/// # Errors
///
/// Returns an error when the directory exists but cannot be read.
pub fn file_names(root: &Path, relative: &str) -> Result<Vec<String>> {
    let dir = root.join(relative);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
