//! Validation of configuration invariants.
//!
//! Validation runs before any polling starts so misconfiguration fails fast.

use regex::Regex;

use crate::defaults::MIN_POLL_INTERVAL_MS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ConnectionConfig, FilterConfig, FolderLayout, HandlerConfig, HotfolderConfig,
    PollIntervalConfig, StabilityConfig,
};

impl HotfolderConfig {
    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_connection(&self.connection)?;
        validate_folders(&self.folders)?;
        validate_filters(&self.filters)?;
        validate_stability(&self.stability)?;
        validate_poll_interval(&self.poll_interval)?;
        validate_handler(&self.handler)?;
        Ok(())
    }
}

fn validate_connection(connection: &ConnectionConfig) -> ConfigResult<()> {
    if connection.address.trim().is_empty() {
        return Err(ConfigError::invalid(
            "connection",
            "address",
            &connection.address,
            "empty",
        ));
    }
    if connection.pool_size == 0 {
        return Err(ConfigError::invalid(
            "connection",
            "pool_size",
            connection.pool_size,
            "must_be_positive",
        ));
    }
    Ok(())
}

fn validate_folders(folders: &FolderLayout) -> ConfigResult<()> {
    let named = [
        ("incoming", &folders.incoming),
        ("processing", &folders.processing),
        ("success", &folders.success),
        ("errors", &folders.errors),
    ];
    for (field, value) in named {
        let trimmed = value.trim_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Err(ConfigError::invalid("folders", field, value, "empty"));
        }
        if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ConfigError::invalid(
                "folders",
                field,
                value,
                "parent_segment",
            ));
        }
    }
    for (index, &(field, value)) in named.iter().enumerate() {
        if named[..index].iter().any(|&(_, other)| other == value) {
            return Err(ConfigError::invalid("folders", field, value, "duplicate"));
        }
    }
    Ok(())
}

fn validate_filters(filters: &FilterConfig) -> ConfigResult<()> {
    for pattern in &filters.include {
        compile_pattern("include", pattern)?;
    }
    for pattern in filters.effective_exclude() {
        compile_pattern("exclude", &pattern)?;
    }
    if let Some(max) = filters.max_size
        && max < filters.min_size
    {
        return Err(ConfigError::invalid(
            "filters",
            "max_size",
            max,
            "below_min_size",
        ));
    }
    if let Some(extensions) = &filters.extensions
        && let Some(blank) = extensions
            .iter()
            .find(|ext| ext.trim_start_matches('.').trim().is_empty())
    {
        return Err(ConfigError::invalid("filters", "extensions", blank, "empty"));
    }
    Ok(())
}

fn validate_stability(stability: &StabilityConfig) -> ConfigResult<()> {
    if stability.checks == 0 {
        return Err(ConfigError::invalid(
            "stability",
            "checks",
            stability.checks,
            "must_be_positive",
        ));
    }
    Ok(())
}

fn validate_poll_interval(poll: &PollIntervalConfig) -> ConfigResult<()> {
    if poll.initial_ms == 0 {
        return Err(ConfigError::invalid(
            "poll_interval",
            "initial_ms",
            poll.initial_ms,
            "must_be_positive",
        ));
    }
    if poll.initial_ms > poll.max_ms {
        return Err(ConfigError::invalid(
            "poll_interval",
            "initial_ms",
            poll.initial_ms,
            "exceeds_max",
        ));
    }
    if poll.max_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::invalid(
            "poll_interval",
            "max_ms",
            poll.max_ms,
            "below_floor",
        ));
    }
    if !poll.backoff_factor.is_finite() || poll.backoff_factor < 0.0 {
        return Err(ConfigError::invalid(
            "poll_interval",
            "backoff_factor",
            poll.backoff_factor,
            "must_be_finite_non_negative",
        ));
    }
    Ok(())
}

fn validate_handler(handler: &HandlerConfig) -> ConfigResult<()> {
    if handler.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "handler",
            "timeout_ms",
            handler.timeout_ms,
            "must_be_positive",
        ));
    }
    if handler
        .command
        .first()
        .is_some_and(|program| program.trim().is_empty())
    {
        return Err(ConfigError::invalid(
            "handler",
            "command",
            handler.command.join(" "),
            "empty_program",
        ));
    }
    Ok(())
}

/// Compile a filter pattern, mapping failures onto `ConfigError::InvalidPattern`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPattern` when the regex does not compile.
pub fn compile_pattern(field: &'static str, pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}
