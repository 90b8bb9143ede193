#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Typed, validated settings for a hot-folder engine.
//!
//! Layout: `model.rs` (settings sections), `defaults.rs` (default values),
//! `validate.rs` (invariant checks), `loader.rs` (YAML/JSON file loading and
//! environment overrides).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{DEFAULT_EXCLUDE_PATTERNS, MIN_POLL_INTERVAL_MS};
pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_from_path, parse_document};
pub use model::{
    CandidateOrder, ConnectionConfig, FailurePolicy, FilterConfig, FolderLayout, HandlerConfig,
    HotfolderConfig, PollIntervalConfig, Secret, StabilityConfig,
};
