use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hotfold_config::HotfolderConfig;
use hotfold_engine::{EngineStats, PollerEngine};
use hotfold_store::LocalStore;
use hotfold_telemetry::{LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::command::CommandHandler;
use crate::error::{AppError, AppResult};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "HOTFOLD_CONFIG";
/// Environment variable selecting `json` or `pretty` log output.
pub const LOG_FORMAT_ENV: &str = "HOTFOLD_LOG_FORMAT";

const STATS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Dependencies required to bootstrap the application.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig,
    config: HotfolderConfig,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment.
    pub(crate) fn from_env() -> AppResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).map_err(|_| AppError::MissingEnv {
            name: CONFIG_PATH_ENV,
        })?;
        let config = hotfold_config::load_from_path(&path)
            .map_err(|err| AppError::config("config.load", err))?;
        let logging = LoggingConfig {
            format: LogFormat::from_name(std::env::var(LOG_FORMAT_ENV).ok().as_deref()),
            ..LoggingConfig::default()
        };
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            logging,
            config,
            metrics,
        })
    }
}

/// Entry point for the Hotfold boot sequence.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, logging cannot be
/// installed, or the engine fails to start.
pub async fn run_app() -> AppResult<()> {
    let BootstrapDependencies {
        logging,
        config,
        metrics,
    } = BootstrapDependencies::from_env()?;
    hotfold_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    info!(build_sha = %logging.build_sha, "Hotfold starting");

    run_engine(config, metrics, STATS_LOG_INTERVAL, shutdown_signal()).await
}

/// Run one engine over the share mounted at `connection.address` until
/// `shutdown` resolves, logging stats every `stats_every`.
///
/// # Errors
///
/// Returns an error when the handler command is missing or the engine fails
/// to start or stop.
pub async fn run_engine(
    config: HotfolderConfig,
    metrics: Metrics,
    stats_every: Duration,
    shutdown: impl Future<Output = ()>,
) -> AppResult<()> {
    let handler = CommandHandler::from_config(&config.connection.address, &config.handler)?;
    let store = Arc::new(LocalStore::new(&config.connection.address));
    let engine = PollerEngine::builder(config)
        .store(store)
        .handler(handler)
        .metrics(metrics.clone())
        .start()
        .await
        .map_err(|err| AppError::engine("engine.start", err))?;
    info!(engine_id = %engine.handle().id(), "engine running");

    let mut ticker = tokio::time::interval(stats_every);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => log_stats(&engine.stats()),
        }
    }

    engine
        .stop("shutdown requested")
        .await
        .map_err(|err| AppError::engine("engine.stop", err))?;
    info!(metrics = ?metrics.snapshot(), "Hotfold stopped");
    Ok(())
}

fn log_stats(stats: &EngineStats) {
    info!(
        status = %stats.status,
        files_processed = stats.files_processed,
        files_failed = stats.files_failed,
        interval_ms = stats.current_interval_ms,
        uptime_secs = stats.uptime.as_secs(),
        "engine stats"
    );
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received");
}
