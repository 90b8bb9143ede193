//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Each engine gets its own registry; nothing is registered globally.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Poll cycle outcome label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcomeLabel {
    /// Skipped because a file was in flight.
    Busy,
    /// Nothing eligible in the incoming folder.
    Idle,
    /// A candidate was still changing size.
    Unstable,
    /// Listing the incoming folder failed.
    ListingFailed,
    /// Moving the candidate into processing failed.
    ClaimFailed,
    /// A file was handled and routed to success.
    Processed,
    /// A file was handled and counted as failed.
    Failed,
}

impl PollOutcomeLabel {
    /// Label value recorded on `hotfold_polls_total`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Idle => "idle",
            Self::Unstable => "unstable",
            Self::ListingFailed => "listing_failed",
            Self::ClaimFailed => "claim_failed",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry shared by one engine's components.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    polls_total: IntCounterVec,
    files_processed_total: IntCounter,
    files_failed_total: IntCounter,
    collisions_resolved_total: IntCounter,
    poll_interval_ms: IntGauge,
}

/// Snapshot of the counters and gauges for health reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Files routed to the success folder.
    pub files_processed_total: u64,
    /// Files counted as failed.
    pub files_failed_total: u64,
    /// Collisions resolved by a unique-suffix rename.
    pub collisions_resolved_total: u64,
    /// Current idle poll interval in milliseconds.
    pub poll_interval_ms: i64,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let polls_total = registered(&registry, "hotfold_polls_total", |name| {
            IntCounterVec::new(Opts::new(name, "Poll cycles executed by outcome"), &["outcome"])
        })?;
        let files_processed_total =
            registered(&registry, "hotfold_files_processed_total", |name| {
                IntCounter::new(name, "Files routed to the success folder")
            })?;
        let files_failed_total = registered(&registry, "hotfold_files_failed_total", |name| {
            IntCounter::new(name, "Files whose handling failed")
        })?;
        let collisions_resolved_total =
            registered(&registry, "hotfold_collisions_resolved_total", |name| {
                IntCounter::new(name, "Name collisions resolved with a unique-suffix rename")
            })?;
        let poll_interval_ms = registered(&registry, "hotfold_poll_interval_ms", |name| {
            IntGauge::new(name, "Current idle poll interval (ms)")
        })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                polls_total,
                files_processed_total,
                files_failed_total,
                collisions_resolved_total,
                poll_interval_ms,
            }),
        })
    }

    /// Count a completed poll cycle.
    pub fn inc_poll(&self, outcome: PollOutcomeLabel) {
        self.inner
            .polls_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Count a file routed to success.
    pub fn inc_processed(&self) {
        self.inner.files_processed_total.inc();
    }

    /// Count a failed file.
    pub fn inc_failed(&self) {
        self.inner.files_failed_total.inc();
    }

    /// Count a collision resolved by renaming.
    pub fn inc_collision_resolved(&self) {
        self.inner.collisions_resolved_total.inc();
    }

    /// Record the interval the poller will wait next.
    pub fn set_poll_interval(&self, interval: Duration) {
        self.inner
            .poll_interval_ms
            .set(i64::try_from(interval.as_millis()).unwrap_or(i64::MAX));
    }

    /// Number of polls recorded with `outcome`.
    #[must_use]
    pub fn polls(&self, outcome: PollOutcomeLabel) -> u64 {
        self.inner
            .polls_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Capture a serialisable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_processed_total: self.inner.files_processed_total.get(),
            files_failed_total: self.inner.files_failed_total.get(),
            collisions_resolved_total: self.inner.collisions_resolved_total.get(),
            poll_interval_ms: self.inner.poll_interval_ms.get(),
        }
    }

    /// Render all collectors in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Build the collector named `metric` and add it to `registry`.
fn registered<C, F>(registry: &Registry, metric: &'static str, build: F) -> Result<C>
where
    C: Collector + Clone + 'static,
    F: FnOnce(&'static str) -> prometheus::Result<C>,
{
    let collector = build(metric).map_err(|source| TelemetryError::Metric { metric, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Metric { metric, source })?;
    Ok(collector)
}
