//! Engine status and the stats snapshot published to observers.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hotfold_config::PollIntervalConfig;
use serde::Serialize;

use crate::backoff::{next_interval, reset_interval};

/// Lifecycle status of one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    /// Started, first poll not yet run.
    Starting,
    /// Idle between polls.
    Polling,
    /// Handling the named file.
    Processing {
        /// Original name of the file in flight.
        name: String,
    },
    /// The last cycle hit a failure; the next poll retries.
    Error,
}

impl EngineStatus {
    /// Whether a file is currently in flight.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Processing { .. })
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Polling => f.write_str("polling"),
            Self::Processing { name } => write!(f, "processing({name})"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Point-in-time view of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Files routed to the success folder.
    pub files_processed: u64,
    /// Files counted as failed.
    pub files_failed: u64,
    /// Current status.
    pub status: EngineStatus,
    /// Time since the engine started.
    pub uptime: Duration,
    /// Start of the most recent poll cycle.
    pub last_poll: Option<DateTime<Utc>>,
    /// Interval the engine waits before the next scheduled poll.
    pub current_interval_ms: u64,
}

/// Mutable state owned by the poll loop.
#[derive(Debug, Clone)]
pub(crate) struct EngineState {
    pub(crate) files_processed: u64,
    pub(crate) files_failed: u64,
    pub(crate) status: EngineStatus,
    pub(crate) last_poll: Option<DateTime<Utc>>,
    pub(crate) interval_ms: u64,
    pub(crate) started: Instant,
}

impl EngineState {
    pub(crate) fn new(poll: &PollIntervalConfig) -> Self {
        Self {
            files_processed: 0,
            files_failed: 0,
            status: EngineStatus::Starting,
            last_poll: None,
            interval_ms: reset_interval(poll),
            started: Instant::now(),
        }
    }

    pub(crate) fn back_off(&mut self, poll: &PollIntervalConfig) {
        self.interval_ms = next_interval(self.interval_ms, poll);
    }

    pub(crate) fn reset_interval(&mut self, poll: &PollIntervalConfig) {
        self.interval_ms = reset_interval(poll);
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        EngineStats {
            files_processed: self.files_processed,
            files_failed: self.files_failed,
            status: self.status.clone(),
            uptime: self.started.elapsed(),
            last_poll: self.last_poll,
            current_interval_ms: self.interval_ms,
        }
    }
}
