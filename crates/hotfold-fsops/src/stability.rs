//! Upload completion detection by repeated size sampling.

use std::time::Duration;

use hotfold_config::StabilityConfig;
use tracing::debug;

use crate::manager::FileManager;

/// Declares a file stable once `checks` consecutive size reads agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityChecker {
    checks: u32,
    interval: Duration,
}

impl StabilityChecker {
    /// Checker requiring `checks` agreeing samples `interval` apart.
    /// A zero count is treated as one.
    #[must_use]
    pub fn new(checks: u32, interval: Duration) -> Self {
        Self {
            checks: checks.max(1),
            interval,
        }
    }

    /// Checker built from configuration.
    #[must_use]
    pub fn from_config(config: &StabilityConfig) -> Self {
        Self::new(config.checks, config.interval())
    }

    /// Whether the size of `path` held steady across every sample.
    ///
    /// A file that cannot be read at any sample is never stable.
    pub async fn is_stable(&self, files: &FileManager, path: &str) -> bool {
        let Ok(first) = files.file_size(path).await else {
            debug!(path, "candidate unreadable; not stable");
            return false;
        };
        for _ in 1..self.checks {
            tokio::time::sleep(self.interval).await;
            match files.file_size(path).await {
                Ok(size) if size == first => {}
                Ok(size) => {
                    debug!(path, first, size, "candidate still changing");
                    return false;
                }
                Err(err) => {
                    debug!(path, error = %err, "candidate vanished during sampling");
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_checks_mean_a_single_read() {
        let checker = StabilityChecker::new(0, Duration::from_millis(5));
        assert_eq!(checker, StabilityChecker::new(1, Duration::from_millis(5)));
    }
}
