//! Telemetry error type.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures raised while installing logging or maintaining metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed.
    #[error("tracing subscriber already installed")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    /// A collector could not be built or added to the engine registry.
    #[error("metric {metric} could not be registered")]
    Metric {
        /// Metric family name.
        metric: &'static str,
        /// Prometheus rejection.
        #[source]
        source: prometheus::Error,
    },
    /// Encoding the registry into the text exposition format failed.
    #[error("metrics could not be encoded")]
    Encode(#[from] prometheus::Error),
    /// The encoder produced bytes that are not UTF-8.
    #[error("encoded metrics are not utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
