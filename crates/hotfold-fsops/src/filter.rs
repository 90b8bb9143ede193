//! Candidate selection rules and naming helpers.
//!
//! # Design
//! - Patterns compile once per engine; matching is allocation-light.
//! - Collision detection works on rendered failure text because handler
//!   failures arrive as opaque reasons, not typed store errors.

use chrono::Utc;
use hotfold_config::{CandidateOrder, FilterConfig};
use regex::Regex;

use crate::error::{FsOpsError, FsOpsResult};
use crate::manager::FileEntry;

/// Lowercase markers that identify an object-name-collision class failure.
const COLLISION_MARKERS: [&str; 6] = [
    "status_object_name_collision",
    "0xc0000035",
    "status_delete_pending",
    "0xc0000056",
    "name collision",
    "already exists",
];

/// A file selected for the current poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// File name inside the incoming folder.
    pub name: String,
    /// Size observed in the listing.
    pub size: u64,
    /// Full share-relative path.
    pub path: String,
}

/// Compiled form of [`FilterConfig`].
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    extensions: Option<Vec<String>>,
    min_size: u64,
    max_size: Option<u64>,
    order: CandidateOrder,
}

impl FileFilter {
    /// Compile the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Pattern`] when an include or exclude regex is invalid.
    pub fn compile(config: &FilterConfig) -> FsOpsResult<Self> {
        let include = compile_all("filters.include", &config.include)?;
        let exclude = compile_all("filters.exclude", &config.effective_exclude())?;
        let extensions = config.extensions.as_ref().map(|list| {
            list.iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect()
        });
        Ok(Self {
            include,
            exclude,
            extensions,
            min_size: config.min_size,
            max_size: config.max_size,
            order: config.order,
        })
    }

    /// Whether a file with `name` and `size` is eligible.
    #[must_use]
    pub fn matches(&self, name: &str, size: u64) -> bool {
        self.name_matches(name) && self.size_matches(size)
    }

    fn name_matches(&self, name: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|re| re.is_match(name));
        if !included || self.exclude.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.extensions.as_ref().is_none_or(|allowed| {
            extension(name).is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                allowed.iter().any(|candidate| *candidate == ext)
            })
        })
    }

    const fn size_matches(&self, size: u64) -> bool {
        if size < self.min_size {
            return false;
        }
        match self.max_size {
            Some(max) => size <= max,
            None => true,
        }
    }

    /// Pick the first eligible entry of a normalised listing of `dir`.
    ///
    /// `Listing` order keeps whatever order the store returned; `Name` picks
    /// the lexicographically smallest eligible name.
    #[must_use]
    pub fn select(&self, dir: &str, entries: &[FileEntry]) -> Option<FileCandidate> {
        let mut eligible = entries
            .iter()
            .filter(|entry| self.matches(&entry.name, entry.size));
        let chosen = match self.order {
            CandidateOrder::Listing => eligible.next(),
            CandidateOrder::Name => eligible.min_by(|a, b| a.name.cmp(&b.name)),
        }?;
        Some(FileCandidate {
            name: chosen.name.clone(),
            size: chosen.size,
            path: hotfold_store::path::join(dir, &chosen.name),
        })
    }
}

fn compile_all(field: &'static str, patterns: &[String]) -> FsOpsResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| FsOpsError::Pattern {
                field,
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Extension of `name` without the dot; dotfiles without a further dot have none.
fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// Whether a failure reason describes a destination-occupied collision.
#[must_use]
pub fn is_collision(reason: &str) -> bool {
    let lowered = reason.to_ascii_lowercase();
    COLLISION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// `path` with `-<epoch millis>` inserted before the extension.
#[must_use]
pub fn unique_variant(path: &str) -> String {
    unique_variant_at(path, Utc::now().timestamp_millis())
}

/// [`unique_variant`] with an explicit timestamp.
#[must_use]
pub fn unique_variant_at(path: &str, millis: i64) -> String {
    let split = path.rfind(['/', '\\']).map_or(0, |index| index + 1);
    let (dir, name) = path.split_at(split);
    match extension(name) {
        Some(ext) => {
            let stem = &name[..name.len() - ext.len() - 1];
            format!("{dir}{stem}-{millis}.{ext}")
        }
        None => format!("{dir}{name}-{millis}"),
    }
}
