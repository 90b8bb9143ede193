//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; validation lives in `validate.rs`.
//! - Every section except `connection` has serde defaults so minimal documents load.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Complete settings for one hot-folder engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotfolderConfig {
    /// How to reach the remote store.
    pub connection: ConnectionConfig,
    /// Root prefix inside the share under which the stage folders live.
    #[serde(default)]
    pub base_path: String,
    /// Stage folder names relative to `base_path`.
    #[serde(default)]
    pub folders: FolderLayout,
    /// Candidate selection rules.
    #[serde(default)]
    pub filters: FilterConfig,
    /// Size-sampling parameters used to detect finished uploads.
    #[serde(default)]
    pub stability: StabilityConfig,
    /// Idle poll scheduling.
    #[serde(default)]
    pub poll_interval: PollIntervalConfig,
    /// Handler deadline and failure handling.
    #[serde(default)]
    pub handler: HandlerConfig,
}

/// Remote store connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Store address, e.g. `\\fileserver\scans` or a mount point.
    pub address: String,
    /// Account name.
    #[serde(default)]
    pub username: String,
    /// Account password.
    #[serde(default)]
    pub password: Secret,
    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// String wrapper that keeps credentials out of debug output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Stage folder names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderLayout {
    /// Folder watched for arriving files.
    pub incoming: String,
    /// Folder holding the file currently being handled.
    pub processing: String,
    /// Folder receiving successfully handled files.
    pub success: String,
    /// Folder receiving quarantined failures.
    pub errors: String,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            incoming: defaults::INCOMING_DIR.to_string(),
            processing: defaults::PROCESSING_DIR.to_string(),
            success: defaults::SUCCESS_DIR.to_string(),
            errors: defaults::ERRORS_DIR.to_string(),
        }
    }
}

/// Order in which filtered candidates are considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrder {
    /// Whatever order the store returned the listing in.
    #[default]
    Listing,
    /// Lexicographic by name.
    Name,
}

/// Candidate selection rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Name regexes; when non-empty a name must match at least one.
    pub include: Vec<String>,
    /// Name regexes that reject a file. `None` applies
    /// [`crate::DEFAULT_EXCLUDE_PATTERNS`].
    pub exclude: Option<Vec<String>>,
    /// Minimum size in bytes.
    pub min_size: u64,
    /// Maximum size in bytes; unbounded when absent.
    pub max_size: Option<u64>,
    /// Extension allow-list, compared case-insensitively without the dot.
    pub extensions: Option<Vec<String>>,
    /// Candidate ordering.
    pub order: CandidateOrder,
}

impl FilterConfig {
    /// Exclude patterns in effect, falling back to the defaults.
    #[must_use]
    pub fn effective_exclude(&self) -> Vec<String> {
        self.exclude.clone().unwrap_or_else(|| {
            defaults::DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }
}

/// Stability detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityConfig {
    /// Number of size samples that must agree (at least one).
    pub checks: u32,
    /// Delay between samples in milliseconds.
    pub interval_ms: u64,
}

impl StabilityConfig {
    /// Delay between samples.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            checks: defaults::STABILITY_CHECKS,
            interval_ms: defaults::STABILITY_INTERVAL_MS,
        }
    }
}

/// Poll scheduling with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollIntervalConfig {
    /// Interval used after work was found, in milliseconds.
    pub initial_ms: u64,
    /// Upper bound for the backed-off interval, in milliseconds.
    pub max_ms: u64,
    /// Multiplier applied when a poll finds nothing to do.
    pub backoff_factor: f64,
}

impl Default for PollIntervalConfig {
    fn default() -> Self {
        Self {
            initial_ms: defaults::POLL_INITIAL_MS,
            max_ms: defaults::POLL_MAX_MS,
            backoff_factor: defaults::POLL_BACKOFF_FACTOR,
        }
    }
}

/// What to do with a file whose handler failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the file in the processing folder for an operator to reconcile.
    #[default]
    Retain,
    /// Move the file into the errors folder.
    Quarantine,
}

/// Handler invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    /// Deadline for one handler invocation, in milliseconds.
    pub timeout_ms: u64,
    /// Additional attempts after a failed invocation.
    pub retries: u32,
    /// External command used by the bundled binary (`program arg...`); the
    /// file path is appended as the final argument.
    pub command: Vec<String>,
    /// Routing for failed files.
    pub on_failure: FailurePolicy,
}

impl HandlerConfig {
    /// Handler deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::HANDLER_TIMEOUT_MS,
            retries: defaults::HANDLER_RETRIES,
            command: Vec::new(),
            on_failure: FailurePolicy::default(),
        }
    }
}

const fn default_pool_size() -> usize {
    defaults::POOL_SIZE
}

impl HotfolderConfig {
    /// Minimal configuration pointing at `address` with every other section defaulted.
    #[must_use]
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            connection: ConnectionConfig {
                address: address.into(),
                username: String::new(),
                password: Secret::default(),
                pool_size: defaults::POOL_SIZE,
            },
            base_path: String::new(),
            folders: FolderLayout::default(),
            filters: FilterConfig::default(),
            stability: StabilityConfig::default(),
            poll_interval: PollIntervalConfig::default(),
            handler: HandlerConfig::default(),
        }
    }
}
