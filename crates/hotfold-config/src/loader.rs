//! Configuration document loading.
//!
//! Documents are YAML; JSON documents load through the same parser.
//! Credentials and the base path can be overridden from the environment so
//! secrets stay out of files.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{HotfolderConfig, Secret};

/// Environment variable overriding `connection.username`.
pub const ENV_USERNAME: &str = "HOTFOLD_USERNAME";
/// Environment variable overriding `connection.password`.
pub const ENV_PASSWORD: &str = "HOTFOLD_PASSWORD";
/// Environment variable overriding `base_path`.
pub const ENV_BASE_PATH: &str = "HOTFOLD_BASE_PATH";

/// Load, override from the process environment, and validate a document.
///
/// # Errors
///
/// Returns an error when the file cannot be read, parsed, or validated.
pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<HotfolderConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml::from_str::<HotfolderConfig>(&raw).map_err(|source| {
        ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        }
    })?;
    let config = apply_env_overrides(config, |name| std::env::var(name).ok());
    config.validate()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Parse and validate an in-memory document.
///
/// # Errors
///
/// Returns an error when the document cannot be parsed or validated.
pub fn parse_document(raw: &str) -> ConfigResult<HotfolderConfig> {
    let config = serde_yaml::from_str::<HotfolderConfig>(raw)
        .map_err(|source| ConfigError::Parse { path: None, source })?;
    config.validate()?;
    Ok(config)
}

/// Apply environment overrides using the supplied lookup.
#[must_use]
pub fn apply_env_overrides<F>(mut config: HotfolderConfig, lookup: F) -> HotfolderConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(username) = lookup(ENV_USERNAME) {
        config.connection.username = username;
    }
    if let Some(password) = lookup(ENV_PASSWORD) {
        config.connection.password = Secret::new(password);
    }
    if let Some(base_path) = lookup(ENV_BASE_PATH) {
        config.base_path = base_path;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateOrder, FailurePolicy};

    const DOCUMENT: &str = r#"
connection:
  address: '\\files\scans'
  username: scanner
  password: from-file
base_path: hot
filters:
  include: ['\.pdf$']
  min_size: 1
  order: name
stability:
  checks: 2
  interval_ms: 250
poll_interval:
  initial_ms: 500
  max_ms: 10000
  backoff_factor: 2.0
handler:
  timeout_ms: 5000
  on_failure: quarantine
"#;

    #[test]
    fn parses_full_document() {
        let config = parse_document(DOCUMENT).expect("document should parse");
        assert_eq!(config.base_path, "hot");
        assert_eq!(config.folders.incoming, "incoming");
        assert_eq!(config.filters.order, CandidateOrder::Name);
        assert_eq!(config.stability.checks, 2);
        assert_eq!(config.handler.on_failure, FailurePolicy::Quarantine);
        assert_eq!(config.connection.pool_size, 4);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_document("connection: {address: x}\nbogus: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn invalid_documents_fail_validation() {
        let err = parse_document(
            "connection: {address: x}\npoll_interval: {initial_ms: 900, max_ms: 100}\n",
        )
        .unwrap_err();
        assert_eq!(err.reason(), Some("exceeds_max"));
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let config = parse_document(DOCUMENT).expect("document should parse");
        let overridden = apply_env_overrides(config, |name| match name {
            ENV_PASSWORD => Some("from-env".to_string()),
            ENV_BASE_PATH => Some("other".to_string()),
            _ => None,
        });
        assert_eq!(overridden.connection.password.expose(), "from-env");
        assert_eq!(overridden.connection.username, "scanner");
        assert_eq!(overridden.base_path, "other");
    }
}
