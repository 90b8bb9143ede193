//! Idle poll interval policy.

use hotfold_config::{MIN_POLL_INTERVAL_MS, PollIntervalConfig};

/// Interval after a poll that found nothing to do:
/// `clamp(round(current * factor), floor, max)` with a floor of
/// [`MIN_POLL_INTERVAL_MS`].
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn next_interval(current_ms: u64, config: &PollIntervalConfig) -> u64 {
    let scaled = (current_ms as f64 * config.backoff_factor).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled as u64
    } else {
        0
    };
    let ceiling = config.max_ms.max(MIN_POLL_INTERVAL_MS);
    scaled.clamp(MIN_POLL_INTERVAL_MS, ceiling)
}

/// Interval after a poll that claimed a file.
#[must_use]
pub fn reset_interval(config: &PollIntervalConfig) -> u64 {
    config.initial_ms.max(MIN_POLL_INTERVAL_MS)
}
