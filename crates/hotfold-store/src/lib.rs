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

//! Remote file-store contract consumed by the hot-folder pipeline.
//!
//! Layout: `error.rs` (store errors), `model.rs` (listing/stat records and the
//! `RemoteStore` trait), `path.rs` (share-relative path helpers), `local.rs`
//! (backend for shares mounted into the local filesystem).

pub mod error;
pub mod local;
pub mod model;
pub mod path;

pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use model::{ConnectionParams, DirEntry, EntryKind, ObjectStat, RemoteStore};
