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

//! File selection and stage-folder operations on top of a remote store.
//!
//! Layout: `filter.rs` (candidate rules, collision detection, unique names),
//! `stability.rs` (size sampling), `manager.rs` (stage paths, listing
//! normalisation, moves), `error.rs` (fsops errors).

pub mod error;
pub mod filter;
pub mod manager;
pub mod stability;

pub use error::{FsOpsError, FsOpsResult};
pub use filter::{FileCandidate, FileFilter, is_collision, unique_variant, unique_variant_at};
pub use manager::{FileEntry, FileManager, StagePaths};
pub use stability::StabilityChecker;
