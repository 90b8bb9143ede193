//! Engine lifecycle: builder, background task, control handle.
//!
//! # Design
//! - One task per engine runs cycles back to back; the only concurrency is
//!   between that task and its observers.
//! - Manual wake-ups are `Notify` permits, so repeated requests while a file
//!   is in flight coalesce into one early poll.
//! - Stats flow through a `watch` channel; readers never touch the store.

use std::sync::Arc;
use std::time::Instant;

use hotfold_config::HotfolderConfig;
use hotfold_store::RemoteStore;
use hotfold_telemetry::Metrics;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::handler::FileHandler;
use crate::poller::Poller;
use crate::state::{EngineStats, EngineStatus};

/// Builder for [`PollerEngine`].
pub struct PollerEngineBuilder {
    config: HotfolderConfig,
    store: Option<Arc<dyn RemoteStore>>,
    handler: Option<Arc<dyn FileHandler>>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for PollerEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerEngineBuilder")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl PollerEngineBuilder {
    /// Remote store shared by every operation of the engine.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Handler invoked for each claimed file.
    #[must_use]
    pub fn handler(mut self, handler: impl FileHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Handler already behind an `Arc`.
    #[must_use]
    pub fn shared_handler(mut self, handler: Arc<dyn FileHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Metrics registry; a private one is created when omitted.
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate, prepare the share and spawn the poll task.
    ///
    /// # Errors
    ///
    /// Fails before any polling when the handler or store is missing, the
    /// configuration is invalid, or metrics cannot be registered.
    pub async fn start(self) -> EngineResult<PollerEngine> {
        let handler = self.handler.ok_or(EngineError::MissingHandler)?;
        let store = self.store.ok_or(EngineError::MissingStore)?;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new()?,
        };
        let poller = Poller::new(&self.config, store, handler, metrics)?;

        let id = Uuid::new_v4();
        let span = info_span!("hotfold_engine", engine_id = %id);
        poller.prepare().instrument(span.clone()).await;

        let stats = poller.subscribe();
        let started = poller.started();
        let wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(poller, Arc::clone(&wake), shutdown_rx).instrument(span));
        info!(engine_id = %id, base_path = %self.config.base_path, "engine started");

        Ok(PollerEngine {
            handle: EngineHandle {
                id,
                started,
                wake,
                stats,
                shutdown: Arc::new(shutdown_tx),
            },
            task,
        })
    }
}

async fn run(mut poller: Poller, wake: Arc<Notify>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            outcome = poller.poll_once() => debug!(?outcome, "poll cycle finished"),
        }
        let wait = poller.current_interval();
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            () = wake.notified() => debug!("manual poll requested"),
            () = tokio::time::sleep(wait) => {}
        }
    }
    debug!("poll loop exited");
}

/// Cloneable control surface of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    id: Uuid,
    started: Instant,
    wake: Arc<Notify>,
    stats: watch::Receiver<EngineStats>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl EngineHandle {
    /// Engine instance identifier, also recorded on its tracing span.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Cut the current idle wait short. Requests made while a file is in
    /// flight collapse into a single poll after it finishes.
    pub fn poll_now(&self) {
        self.wake.notify_one();
    }

    /// Latest stats snapshot.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let mut stats = self.stats.borrow().clone();
        stats.uptime = self.started.elapsed();
        stats
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.stats.borrow().status.clone()
    }

    /// Stream of stats snapshots, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> WatchStream<EngineStats> {
        WatchStream::new(self.stats.clone())
    }

    /// Ask the poll task to exit; an in-flight cycle is abandoned.
    pub fn stop(&self, reason: &str) {
        info!(engine_id = %self.id, reason, "engine stop requested");
        self.shutdown.send_replace(true);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// A running hot-folder engine.
#[derive(Debug)]
pub struct PollerEngine {
    handle: EngineHandle,
    task: JoinHandle<()>,
}

impl PollerEngine {
    /// Start configuring an engine.
    #[must_use]
    pub const fn builder(config: HotfolderConfig) -> PollerEngineBuilder {
        PollerEngineBuilder {
            config,
            store: None,
            handler: None,
            metrics: None,
        }
    }

    /// Control handle that can be shared with other tasks.
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// See [`EngineHandle::poll_now`].
    pub fn poll_now(&self) {
        self.handle.poll_now();
    }

    /// See [`EngineHandle::stats`].
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.handle.stats()
    }

    /// See [`EngineHandle::status`].
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.handle.status()
    }

    /// See [`EngineHandle::subscribe`].
    #[must_use]
    pub fn subscribe(&self) -> WatchStream<EngineStats> {
        self.handle.subscribe()
    }

    /// Stop the engine and wait for its task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Task`] when the poll task panicked.
    pub async fn stop(self, reason: &str) -> EngineResult<()> {
        self.handle.stop(reason);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(EngineError::Task {
                detail: err.to_string(),
            }),
        }
    }
}
