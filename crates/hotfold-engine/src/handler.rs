//! Caller handler contract and isolated invocation.
//!
//! # Design
//! - Every invocation runs on its own task so a panic cannot unwind into the
//!   poll loop.
//! - The deadline is the only enforced timeout in a cycle; expiry aborts the task.
//! - Failure reasons are flattened to text so collision detection works the
//!   same for typed store errors and opaque handler errors.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hotfold_fsops::is_collision;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// What the handler is told about a claimed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    /// Share-relative path inside the processing folder.
    pub path: String,
    /// Original name as found in the incoming folder.
    pub name: String,
    /// Size in bytes at claim time.
    pub size: u64,
}

/// Caller-supplied processing step for claimed files.
#[async_trait]
pub trait FileHandler: Send + Sync + 'static {
    /// Process one file, returning an arbitrary payload on success.
    async fn handle(&self, file: FileDescriptor) -> anyhow::Result<Value>;
}

/// [`FileHandler`] backed by an async closure.
pub struct FnHandler<F> {
    func: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Adapt an async closure into a [`FileHandler`].
pub const fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(FileDescriptor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> FileHandler for FnHandler<F>
where
    F: Fn(FileDescriptor) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn handle(&self, file: FileDescriptor) -> anyhow::Result<Value> {
        (self.func)(file).await
    }
}

/// Why a handler invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFailure {
    /// The deadline expired before the handler finished.
    #[error("handler timed out")]
    TimedOut {
        /// Deadline that was exceeded.
        after: Duration,
    },
    /// The handler panicked or was cancelled.
    #[error("handler terminated abnormally")]
    Abnormal {
        /// Panic payload or cancellation detail.
        detail: String,
    },
    /// The handler returned an error.
    #[error("handler rejected file")]
    Rejected {
        /// Rendered error chain.
        reason: String,
    },
}

impl HandlerFailure {
    /// Short tag recorded in logs and used for collision detection.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::TimedOut { .. } => "timeout".to_string(),
            Self::Abnormal { detail } => format!("abnormal termination: {detail}"),
            Self::Rejected { reason } => reason.clone(),
        }
    }

    /// Whether the failure reports a destination-name collision.
    #[must_use]
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Rejected { reason } if is_collision(reason))
    }
}

/// Runs a [`FileHandler`] under a deadline with a retry budget.
#[derive(Clone)]
pub struct HandlerInvoker {
    handler: Arc<dyn FileHandler>,
    timeout: Duration,
    retries: u32,
}

impl std::fmt::Debug for HandlerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerInvoker")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl HandlerInvoker {
    /// Wrap `handler` with a per-attempt `timeout` and `retries` extra attempts.
    #[must_use]
    pub fn new(handler: Arc<dyn FileHandler>, timeout: Duration, retries: u32) -> Self {
        Self {
            handler,
            timeout,
            retries,
        }
    }

    /// Invoke the handler, re-attempting non-collision failures while the
    /// retry budget lasts.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last attempt.
    pub async fn invoke(&self, file: &FileDescriptor) -> Result<Value, HandlerFailure> {
        let mut attempt = 0;
        loop {
            match self.invoke_once(file.clone()).await {
                Ok(payload) => return Ok(payload),
                Err(failure) if failure.is_collision() || attempt >= self.retries => {
                    return Err(failure);
                }
                Err(failure) => {
                    attempt += 1;
                    warn!(
                        file = %file.name,
                        attempt,
                        retries = self.retries,
                        reason = %failure.reason(),
                        "handler failed; retrying"
                    );
                }
            }
        }
    }

    /// One isolated attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerFailure`] describing timeout, panic, or rejection.
    pub async fn invoke_once(&self, file: FileDescriptor) -> Result<Value, HandlerFailure> {
        let handler = Arc::clone(&self.handler);
        let mut task = tokio::spawn(async move { handler.handle(file).await });
        match tokio::time::timeout(self.timeout, &mut task).await {
            Err(_) => {
                task.abort();
                debug!(timeout = ?self.timeout, "handler deadline expired");
                Err(HandlerFailure::TimedOut {
                    after: self.timeout,
                })
            }
            Ok(Err(join)) => {
                let detail = if join.is_panic() {
                    panic_detail(join.into_panic())
                } else {
                    "cancelled".to_string()
                };
                Err(HandlerFailure::Abnormal { detail })
            }
            Ok(Ok(Err(err))) => Err(HandlerFailure::Rejected {
                reason: format!("{err:#}"),
            }),
            Ok(Ok(Ok(payload))) => Ok(payload),
        }
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}
