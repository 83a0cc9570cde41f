//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_paths(field: &str, paths: &[String]) -> Result<(), ConfigError> {
    match paths.iter().find(|p| !p.starts_with('/')) {
        Some(bad) => Err(invalid(field, format!("'{bad}' must start with '/'"))),
        None => Ok(()),
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin_url` is not an absolute http(s) URL
    /// - `version` or `user_agent` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_generation_bytes` is 0
    /// - a manifest entry, the offline document, or a route prefix is not an
    ///   absolute path
    ///
    /// Returns `ConfigError::Missing` if the manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin_url).map_err(|e| invalid("origin_url", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin_url", "must use http or https"));
        }

        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_generation_bytes == 0 {
            return Err(invalid("max_generation_bytes", "must be greater than 0"));
        }

        if self.manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "manifest".into(),
                hint: "list at least the offline document in the config file".into(),
            });
        }
        check_paths("manifest", &self.manifest)?;
        check_paths("offline_document", std::slice::from_ref(&self.offline_document))?;
        check_paths("api_prefixes", &self.api_prefixes)?;
        check_paths("media_prefixes", &self.media_prefixes)?;
        check_paths("network_first_prefixes", &self.network_first_prefixes)?;

        if !self.manifest.contains(&self.offline_document) {
            tracing::warn!(
                offline_document = %self.offline_document,
                "offline_document is not in the manifest; \
                 the offline fallback only works once it has been cached dynamically"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin_url: "ftp://zubid.example".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin_url"));
    }

    #[test]
    fn test_validate_origin_unparseable() {
        let config = AppConfig { origin_url: "localhost".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin_url"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let low = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(low.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let high = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(high.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let edge = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_quota() {
        let config = AppConfig { max_generation_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_generation_bytes"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { manifest: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_validate_relative_manifest_entry() {
        let config = AppConfig { manifest: vec!["index.html".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "manifest"));
    }

    #[test]
    fn test_validate_relative_prefix() {
        let config = AppConfig { api_prefixes: vec!["api/".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_prefixes"));
    }
}
