//! One poll cycle: discover, claim, handle, route.
//!
//! # Design
//! - The poller owns all mutable engine state; cycles take `&mut self` so two
//!   cycles can never overlap.
//! - Per-file failures end in counters and status, never in an `Err`.
//! - A stats snapshot is published on every status transition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use hotfold_config::{ConnectionConfig, FailurePolicy, HotfolderConfig, PollIntervalConfig};
use hotfold_fsops::{FileCandidate, FileFilter, FileManager, StabilityChecker, StagePaths};
use hotfold_store::RemoteStore;
use hotfold_telemetry::{Metrics, PollOutcomeLabel};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::handler::{FileDescriptor, FileHandler, HandlerFailure, HandlerInvoker};
use crate::state::{EngineState, EngineStats, EngineStatus};

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A file was already in flight; discovery was skipped.
    Busy,
    /// No eligible file was found.
    Idle,
    /// The selected candidate was still changing size.
    Unstable {
        /// Candidate name.
        name: String,
    },
    /// Listing the incoming folder failed.
    ListingFailed,
    /// The candidate could not be moved into the processing folder.
    ClaimFailed {
        /// Candidate name.
        name: String,
    },
    /// The file was handled and now lives in the success folder.
    Processed {
        /// Original name.
        name: String,
        /// Final share-relative path.
        destination: String,
        /// Whether a unique-suffixed name had to be used.
        renamed: bool,
    },
    /// The file was counted as failed.
    Failed {
        /// Original name.
        name: String,
        /// Where the file was left.
        path: String,
    },
}

impl CycleOutcome {
    const fn label(&self) -> PollOutcomeLabel {
        match self {
            Self::Busy => PollOutcomeLabel::Busy,
            Self::Idle => PollOutcomeLabel::Idle,
            Self::Unstable { .. } => PollOutcomeLabel::Unstable,
            Self::ListingFailed => PollOutcomeLabel::ListingFailed,
            Self::ClaimFailed { .. } => PollOutcomeLabel::ClaimFailed,
            Self::Processed { .. } => PollOutcomeLabel::Processed,
            Self::Failed { .. } => PollOutcomeLabel::Failed,
        }
    }
}

/// Poll cycle state machine for one folder tree.
pub struct Poller {
    connection: ConnectionConfig,
    poll: PollIntervalConfig,
    on_failure: FailurePolicy,
    files: FileManager,
    filter: FileFilter,
    stability: StabilityChecker,
    invoker: HandlerInvoker,
    metrics: Metrics,
    state: EngineState,
    stats_tx: watch::Sender<EngineStats>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("stages", self.files.stages())
            .field("status", &self.state.status)
            .field("interval_ms", &self.state.interval_ms)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Validate `config` and bind the poller to its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for invalid settings and
    /// [`EngineError::Filter`] when filter patterns do not compile.
    pub fn new(
        config: &HotfolderConfig,
        store: Arc<dyn RemoteStore>,
        handler: Arc<dyn FileHandler>,
        metrics: Metrics,
    ) -> EngineResult<Self> {
        config.validate()?;
        let filter =
            FileFilter::compile(&config.filters).map_err(|source| EngineError::Filter { source })?;
        let stages = StagePaths::resolve(&config.base_path, &config.folders);
        let state = EngineState::new(&config.poll_interval);
        let (stats_tx, _) = watch::channel(state.snapshot());
        metrics.set_poll_interval(Duration::from_millis(state.interval_ms));
        Ok(Self {
            connection: config.connection.clone(),
            poll: config.poll_interval,
            on_failure: config.handler.on_failure,
            files: FileManager::new(store, stages),
            filter,
            stability: StabilityChecker::from_config(&config.stability),
            invoker: HandlerInvoker::new(
                handler,
                config.handler.timeout(),
                config.handler.retries,
            ),
            metrics,
            state,
            stats_tx,
        })
    }

    /// Best-effort connection pre-warm and stage folder creation.
    pub async fn prepare(&self) {
        if let Err(err) = self.files.prewarm(&self.connection).await {
            warn!(address = %self.connection.address, error = %err, "store pre-warm failed; continuing");
        }
        let failed = self.files.ensure_layout().await;
        if !failed.is_empty() {
            warn!(stages = ?failed, "some stage folders could not be created");
        }
    }

    /// Receiver of stats snapshots, updated on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EngineStats> {
        self.stats_tx.subscribe()
    }

    /// Current stats.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.state.snapshot()
    }

    /// Instant the engine state was created; uptime is measured from here.
    pub(crate) const fn started(&self) -> Instant {
        self.state.started
    }

    /// Wait before the next scheduled poll.
    #[must_use]
    pub const fn current_interval(&self) -> Duration {
        Duration::from_millis(self.state.interval_ms)
    }

    /// Stage folder paths.
    #[must_use]
    pub const fn stages(&self) -> &StagePaths {
        self.files.stages()
    }

    /// Run one poll cycle to completion.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        self.metrics.inc_poll(outcome.label());
        self.metrics.set_poll_interval(self.current_interval());
        self.publish();
        outcome
    }

    async fn cycle(&mut self) -> CycleOutcome {
        if self.state.status.is_processing() {
            debug!("file in flight; deferring poll");
            return CycleOutcome::Busy;
        }
        self.state.last_poll = Some(Utc::now());
        if self.state.status == EngineStatus::Starting {
            self.set_status(EngineStatus::Polling);
        }

        let incoming = self.files.stages().incoming.clone();
        let listed = self.files.list(&incoming).await;
        let entries = match listed {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %incoming, error = %err, "listing incoming folder failed");
                self.set_status(EngineStatus::Error);
                self.state.back_off(&self.poll);
                return CycleOutcome::ListingFailed;
            }
        };

        let Some(candidate) = self.filter.select(&incoming, &entries) else {
            self.set_status(EngineStatus::Polling);
            self.state.back_off(&self.poll);
            return CycleOutcome::Idle;
        };

        if !self.stability.is_stable(&self.files, &candidate.path).await {
            debug!(file = %candidate.name, "candidate not yet stable");
            self.set_status(EngineStatus::Polling);
            self.state.back_off(&self.poll);
            return CycleOutcome::Unstable {
                name: candidate.name,
            };
        }

        self.state.reset_interval(&self.poll);
        self.set_status(EngineStatus::Processing {
            name: candidate.name.clone(),
        });
        self.process(candidate).await
    }

    async fn process(&mut self, candidate: FileCandidate) -> CycleOutcome {
        let processing = self.files.stages().processing.clone();
        let claim = self
            .files
            .move_unique(&candidate.path, &processing, &candidate.name)
            .await;
        let claimed = match claim {
            Ok(path) => path,
            Err(err) => {
                warn!(file = %candidate.name, error = %err, "failed to claim file");
                self.set_status(EngineStatus::Error);
                return CycleOutcome::ClaimFailed {
                    name: candidate.name,
                };
            }
        };
        info!(file = %candidate.name, path = %claimed, size = candidate.size, "file claimed");

        let descriptor = FileDescriptor {
            path: claimed,
            name: candidate.name,
            size: candidate.size,
        };
        let result = self.invoker.invoke(&descriptor).await;
        match result {
            Ok(_) => self.route_success(descriptor).await,
            Err(failure) if failure.is_collision() => {
                info!(
                    file = %descriptor.name,
                    reason = %failure.reason(),
                    "handler reported a name collision; routing to success"
                );
                self.route_success(descriptor).await
            }
            Err(failure) => self.route_failure(descriptor, &failure).await,
        }
    }

    async fn route_success(&mut self, file: FileDescriptor) -> CycleOutcome {
        let success = self.files.stages().success.clone();
        let plain = hotfold_store::path::join(&success, &file.name);
        let routed = self.files.move_unique(&file.path, &success, &file.name).await;
        match routed {
            Ok(destination) => {
                let renamed = destination != plain;
                if renamed {
                    info!(file = %file.name, destination = %destination, "success name taken; stored under unique name");
                    self.metrics.inc_collision_resolved();
                } else {
                    info!(file = %file.name, destination = %destination, "file processed");
                }
                self.state.files_processed += 1;
                self.metrics.inc_processed();
                self.set_status(EngineStatus::Polling);
                CycleOutcome::Processed {
                    name: file.name,
                    destination,
                    renamed,
                }
            }
            Err(err) => {
                warn!(file = %file.name, path = %file.path, error = %err, "failed to route file to success; leaving in processing");
                self.count_failure();
                CycleOutcome::Failed {
                    name: file.name,
                    path: file.path,
                }
            }
        }
    }

    async fn route_failure(&mut self, file: FileDescriptor, failure: &HandlerFailure) -> CycleOutcome {
        warn!(file = %file.name, path = %file.path, reason = %failure.reason(), "handler failed");
        let path = match self.on_failure {
            FailurePolicy::Retain => file.path,
            FailurePolicy::Quarantine => {
                let errors = self.files.stages().errors.clone();
                let quarantined = self.files.move_unique(&file.path, &errors, &file.name).await;
                match quarantined {
                    Ok(path) => {
                        info!(file = %file.name, path = %path, "failed file quarantined");
                        path
                    }
                    Err(err) => {
                        warn!(file = %file.name, error = %err, "quarantine move failed; leaving in processing");
                        file.path
                    }
                }
            }
        };
        self.count_failure();
        CycleOutcome::Failed {
            name: file.name,
            path,
        }
    }

    fn count_failure(&mut self) {
        self.state.files_failed += 1;
        self.metrics.inc_failed();
        self.set_status(EngineStatus::Error);
    }

    fn set_status(&mut self, status: EngineStatus) {
        if self.state.status != status {
            debug!(from = %self.state.status, to = %status, "status transition");
            self.state.status = status;
            self.publish();
        }
    }

    fn publish(&self) {
        self.stats_tx.send_replace(self.state.snapshot());
    }
}
