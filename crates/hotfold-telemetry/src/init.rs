//! Global tracing subscriber for the `hotfold` binary.
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::level`]. The build
//! identifier is remembered after a successful install so later records
//! (and [`build_sha`]) agree on it.

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::Result;

/// Filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Output layout of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per record, with the enclosing engine span.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// `Pretty` for debug builds, `Json` otherwise.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse `json` or `pretty` (case-insensitive); anything else infers.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::infer(),
        }
    }
}

/// How the binary logs.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive applied when `RUST_LOG` is absent.
    pub level: String,
    /// Record layout.
    pub format: LogFormat,
    /// Build identifier, from `HOTFOLD_BUILD_SHA` at compile time.
    pub build_sha: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_owned(),
            format: LogFormat::infer(),
            build_sha: option_env!("HOTFOLD_BUILD_SHA").unwrap_or("dev").to_owned(),
        }
    }
}

/// Build identifier recorded by [`init_logging`], or `dev` before that.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`crate::TelemetryError::Subscriber`] when a global subscriber
/// is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(false).boxed(),
    };
    Registry::default().with(output).with(filter).try_init()?;
    let _ = BUILD_SHA.set(config.build_sha.clone());
    Ok(())
}
