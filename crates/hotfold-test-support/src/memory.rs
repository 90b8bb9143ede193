//! Scriptable in-memory [`RemoteStore`] with fault injection.
//!
//! Files keep insertion order so listing order is predictable; directories
//! are listed before files. Fault knobs cover the behaviours a real share
//! produces that a local directory cannot: delete-pending names, flaky
//! listings, failing renames, files that are still being written.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hotfold_store::{
    ConnectionParams, DirEntry, EntryKind, ObjectStat, RemoteStore, StoreError, StoreResult,
    path::segments,
};

/// In-memory store shared between a test and the engine under test.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<String>,
    files: Vec<(String, Vec<u8>)>,
    reserved: BTreeSet<String>,
    growth: BTreeMap<String, u64>,
    failing_renames: Vec<String>,
    failing_mkdirs: BTreeSet<String>,
    failing_lists: u32,
    omit_sizes: bool,
    delayed_deletes: bool,
    fail_connect: bool,
    connect_calls: u32,
}

impl State {
    fn file_index(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|(name, _)| name == path)
    }

    fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path) || self.file_index(path).is_some()
    }

    fn parent_exists(&self, path: &str) -> bool {
        path.rsplit_once('/')
            .is_none_or(|(parent, _)| self.dirs.contains(parent))
    }

    fn insert_dirs(&mut self, path: &str) {
        let mut current = String::new();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.dirs.insert(current.clone());
        }
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.dirs.iter().any(|path| path.starts_with(&prefix))
            || self.files.iter().any(|(path, _)| path.starts_with(&prefix))
    }
}

fn normalise(path: &str) -> StoreResult<String> {
    segments(path)
        .map(|parts| parts.join("/"))
        .ok_or_else(|| StoreError::InvalidPath {
            path: path.to_string(),
            reason: "parent_segment",
        })
}

fn child_of<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    let rest = if dir.is_empty() {
        path
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

fn not_found(path: &str) -> StoreError {
    StoreError::NotFound {
        path: path.to_string(),
    }
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create `path` with `data`, adding any missing parent directories.
    pub fn put_file(&self, path: &str, data: &[u8]) {
        let Ok(path) = normalise(path) else {
            return;
        };
        let mut state = self.lock();
        if let Some((parent, _)) = path.rsplit_once('/') {
            state.insert_dirs(parent);
        }
        match state.file_index(&path) {
            Some(index) => state.files[index].1 = data.to_vec(),
            None => state.files.push((path, data.to_vec())),
        }
    }

    /// Create a directory and its parents.
    pub fn put_dir(&self, path: &str) {
        if let Ok(path) = normalise(path) {
            self.lock().insert_dirs(&path);
        }
    }

    /// Contents of a file, if present.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalise(path).ok()?;
        let state = self.lock();
        state.file_index(&path).map(|index| state.files[index].1.clone())
    }

    /// Whether a file exists at `path`.
    #[must_use]
    pub fn has_file(&self, path: &str) -> bool {
        self.contents(path).is_some()
    }

    /// Whether a directory exists at `path`.
    #[must_use]
    pub fn has_dir(&self, path: &str) -> bool {
        normalise(path).is_ok_and(|path| self.lock().dirs.contains(&path))
    }

    /// Names of files directly under `dir`, in listing order.
    #[must_use]
    pub fn file_names(&self, dir: &str) -> Vec<String> {
        let Ok(dir) = normalise(dir) else {
            return Vec::new();
        };
        self.lock()
            .files
            .iter()
            .filter_map(|(path, _)| child_of(&dir, path).map(str::to_string))
            .collect()
    }

    /// Keep `path` occupied by an invisible delete-pending object; renames
    /// onto it fail with a collision.
    pub fn reserve(&self, path: &str) {
        if let Ok(path) = normalise(path) {
            self.lock().reserved.insert(path);
        }
    }

    /// Fail the next `count` listings with a transport error.
    pub fn fail_next_lists(&self, count: u32) {
        self.lock().failing_lists = count;
    }

    /// Fail every rename whose destination starts with `prefix`.
    pub fn fail_renames_to(&self, prefix: &str) {
        if let Ok(prefix) = normalise(prefix) {
            self.lock().failing_renames.push(prefix);
        }
    }

    /// Fail `mkdir_recursive` for exactly `path`.
    pub fn fail_mkdir(&self, path: &str) {
        if let Ok(path) = normalise(path) {
            self.lock().failing_mkdirs.insert(path);
        }
    }

    /// Append `bytes` to the file after every `stat`, simulating an upload in progress.
    pub fn grow_on_stat(&self, path: &str, bytes: u64) {
        if let Ok(path) = normalise(path) {
            self.lock().growth.insert(path, bytes);
        }
    }

    /// Return listings without sizes so callers must `stat` each entry.
    pub fn omit_listing_sizes(&self) {
        self.lock().omit_sizes = true;
    }

    /// Turn deleted files into delete-pending names instead of freeing them.
    pub fn delay_deletes(&self) {
        self.lock().delayed_deletes = true;
    }

    /// Make `connect` fail.
    pub fn fail_connect(&self) {
        self.lock().fail_connect = true;
    }

    /// Number of `connect` calls observed.
    #[must_use]
    pub fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn connect(&self, params: &ConnectionParams) -> StoreResult<()> {
        let mut state = self.lock();
        state.connect_calls += 1;
        if state.fail_connect {
            return Err(StoreError::Transport {
                operation: "connect",
                path: params.address.clone(),
                detail: "simulated connect failure".to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> StoreResult<Vec<DirEntry>> {
        let dir = normalise(path)?;
        let mut state = self.lock();
        if state.failing_lists > 0 {
            state.failing_lists -= 1;
            return Err(StoreError::Transport {
                operation: "list",
                path: dir,
                detail: "simulated listing failure".to_string(),
            });
        }
        if !dir.is_empty() && !state.dirs.contains(&dir) {
            return Err(not_found(&dir));
        }
        let mut entries: Vec<DirEntry> = state
            .dirs
            .iter()
            .filter_map(|path| child_of(&dir, path).map(DirEntry::directory))
            .collect();
        for (path, data) in &state.files {
            if let Some(name) = child_of(&dir, path) {
                entries.push(DirEntry {
                    name: name.to_string(),
                    kind: EntryKind::File,
                    size: (!state.omit_sizes).then_some(data.len() as u64),
                });
            }
        }
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> StoreResult<ObjectStat> {
        let path = normalise(path)?;
        let mut state = self.lock();
        if state.dirs.contains(&path) {
            return Ok(ObjectStat {
                kind: EntryKind::Directory,
                size: 0,
                modified: None,
            });
        }
        let index = state.file_index(&path).ok_or_else(|| not_found(&path))?;
        let size = state.files[index].1.len() as u64;
        if let Some(bytes) = state.growth.get(&path).copied() {
            let extra = usize::try_from(bytes).unwrap_or(usize::MAX);
            state.files[index].1.extend(std::iter::repeat_n(b'+', extra));
        }
        Ok(ObjectStat {
            kind: EntryKind::File,
            size,
            modified: None,
        })
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        let from = normalise(from)?;
        let to = normalise(to)?;
        let mut state = self.lock();
        if state.failing_renames.iter().any(|prefix| to.starts_with(prefix.as_str())) {
            return Err(StoreError::Transport {
                operation: "rename",
                path: to,
                detail: "simulated rename failure".to_string(),
            });
        }
        let index = state.file_index(&from).ok_or_else(|| not_found(&from))?;
        if state.reserved.contains(&to) {
            return Err(StoreError::DeletePending { path: to });
        }
        if state.exists(&to) {
            return Err(StoreError::AlreadyExists { path: to });
        }
        if !state.parent_exists(&to) {
            return Err(not_found(&to));
        }
        let (_, data) = state.files.remove(index);
        state.growth.remove(&from);
        state.files.push((to, data));
        Ok(())
    }

    async fn mkdir_recursive(&self, path: &str) -> StoreResult<()> {
        let path = normalise(path)?;
        let mut state = self.lock();
        if state.failing_mkdirs.contains(&path) {
            return Err(StoreError::Transport {
                operation: "mkdir",
                path,
                detail: "simulated mkdir failure".to_string(),
            });
        }
        if state.file_index(&path).is_some() {
            return Err(StoreError::AlreadyExists { path });
        }
        state.insert_dirs(&path);
        Ok(())
    }

    async fn read_all(&self, path: &str) -> StoreResult<Vec<u8>> {
        let path = normalise(path)?;
        let state = self.lock();
        state
            .file_index(&path)
            .map(|index| state.files[index].1.clone())
            .ok_or_else(|| not_found(&path))
    }

    async fn write_all(&self, path: &str, data: &[u8]) -> StoreResult<u64> {
        let path = normalise(path)?;
        let mut state = self.lock();
        if !state.parent_exists(&path) {
            return Err(not_found(&path));
        }
        match state.file_index(&path) {
            Some(index) => state.files[index].1 = data.to_vec(),
            None => state.files.push((path, data.to_vec())),
        }
        Ok(data.len() as u64)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let path = normalise(path)?;
        let mut state = self.lock();
        if let Some(index) = state.file_index(&path) {
            state.files.remove(index);
            if state.delayed_deletes {
                state.reserved.insert(path);
            }
            return Ok(());
        }
        if state.dirs.contains(&path) {
            if state.has_children(&path) {
                return Err(StoreError::DirectoryNotEmpty { path });
            }
            state.dirs.remove(&path);
        }
        Ok(())
    }

    async fn is_accessible(&self, path: &str) -> StoreResult<bool> {
        let path = normalise(path)?;
        let state = self.lock();
        Ok(state.exists(&path) && !state.reserved.contains(&path))
    }
}
