//! Default values for configuration sections.
//!
//! # Design
//! - Keep every default in one place so serde defaults and docs agree.
//! - Durations are milliseconds, matching the `*_ms` fields.

/// Hard floor for the poll interval, regardless of backoff settings.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Name patterns excluded unless the configuration supplies its own list:
/// dotfiles and tilde-suffixed editor/temp files.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[r"^\.", r"~$"];

pub(crate) const INCOMING_DIR: &str = "incoming";
pub(crate) const PROCESSING_DIR: &str = "processing";
pub(crate) const SUCCESS_DIR: &str = "success";
pub(crate) const ERRORS_DIR: &str = "errors";

pub(crate) const POOL_SIZE: usize = 4;

pub(crate) const STABILITY_CHECKS: u32 = 3;
pub(crate) const STABILITY_INTERVAL_MS: u64 = 1_000;

pub(crate) const POLL_INITIAL_MS: u64 = 1_000;
pub(crate) const POLL_MAX_MS: u64 = 30_000;
pub(crate) const POLL_BACKOFF_FACTOR: f64 = 1.5;

pub(crate) const HANDLER_TIMEOUT_MS: u64 = 60_000;
pub(crate) const HANDLER_RETRIES: u32 = 0;
