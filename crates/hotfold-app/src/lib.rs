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

//! Hotfold application wiring.
//!
//! Layout: `bootstrap.rs` (environment loading and run loop), `command.rs`
//! (external command handler), `error.rs` (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Handler that runs an external program per file.
pub mod command;
/// Application error types.
pub mod error;

pub use bootstrap::{run_app, run_engine};
pub use command::CommandHandler;
pub use error::{AppError, AppResult};
