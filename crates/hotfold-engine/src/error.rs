//! # Design
//!
//! - Only start-up problems surface as errors; per-file failures are absorbed
//!   into counters and status.
//! - Constant messages with structured sources.

use hotfold_config::ConfigError;
use hotfold_fsops::FsOpsError;
use hotfold_telemetry::TelemetryError;
use thiserror::Error;

/// Result alias for engine lifecycle operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while starting or stopping an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No file handler was supplied to the builder.
    #[error("engine handler missing")]
    MissingHandler,
    /// No remote store was supplied to the builder.
    #[error("engine store missing")]
    MissingStore,
    /// The configuration failed validation.
    #[error("engine configuration invalid")]
    Config {
        /// Validation failure.
        #[from]
        source: ConfigError,
    },
    /// Filter patterns failed to compile.
    #[error("engine filter invalid")]
    Filter {
        /// Compilation failure.
        source: FsOpsError,
    },
    /// Metrics collectors could not be registered.
    #[error("engine metrics unavailable")]
    Metrics {
        /// Registration failure.
        #[from]
        source: TelemetryError,
    },
    /// The poll task ended abnormally.
    #[error("engine task failed")]
    Task {
        /// Join failure detail.
        detail: String,
    },
}
