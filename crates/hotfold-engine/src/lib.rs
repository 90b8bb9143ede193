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

//! Hot-folder polling engine.
//!
//! Layout: `engine.rs` (task lifecycle and control handle), `poller.rs` (one
//! poll cycle), `handler.rs` (caller handler contract and isolation),
//! `backoff.rs` (idle interval policy), `state.rs` (status and stats),
//! `error.rs` (engine errors).

pub mod backoff;
pub mod engine;
pub mod error;
pub mod handler;
pub mod poller;
pub mod state;

pub use engine::{EngineHandle, PollerEngine, PollerEngineBuilder};
pub use error::{EngineError, EngineResult};
pub use handler::{FileDescriptor, FileHandler, FnHandler, HandlerFailure, HandlerInvoker, handler_fn};
pub use poller::{CycleOutcome, Poller};
pub use state::{EngineStats, EngineStatus};
