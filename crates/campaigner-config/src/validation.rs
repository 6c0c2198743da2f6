// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero limits, well-formed URLs, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CampaignerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CampaignerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let rl = &config.rate_limit;
    if rl.requests_per_window == 0 {
        fail("rate_limit.requests_per_window must be at least 1".to_string());
    }
    if rl.window_secs == 0 {
        fail("rate_limit.window_secs must be at least 1".to_string());
    }
    if rl.max_concurrency == 0 {
        fail("rate_limit.max_concurrency must be at least 1".to_string());
    }

    let d = &config.dispatch;
    if d.campaigns_per_tick == 0 {
        fail("dispatch.campaigns_per_tick must be at least 1".to_string());
    }
    if d.max_batch_size == 0 {
        fail("dispatch.max_batch_size must be at least 1".to_string());
    }
    if d.worker_concurrency == 0 {
        fail("dispatch.worker_concurrency must be at least 1".to_string());
    }
    if d.max_attempts == 0 {
        fail("dispatch.max_attempts must be at least 1".to_string());
    }
    if d.tick_interval_secs == 0 {
        fail("dispatch.tick_interval_secs must be at least 1".to_string());
    }
    if d.claim_lease_secs < config.provider.timeout_secs {
        fail(format!(
            "dispatch.claim_lease_secs ({}) must not be shorter than provider.timeout_secs ({})",
            d.claim_lease_secs, config.provider.timeout_secs
        ));
    }

    if !is_http_url(&config.provider.endpoint) {
        fail(format!(
            "provider.endpoint `{}` must be an http(s) URL",
            config.provider.endpoint
        ));
    }
    if !is_http_url(&config.content.unsubscribe_base_url) {
        fail(format!(
            "content.unsubscribe_base_url `{}` must be an http(s) URL",
            config.content.unsubscribe_base_url
        ));
    }
    if !config.content.from_address.contains('@') {
        fail(format!(
            "content.from_address `{}` is not an email address",
            config.content.from_address
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    (s.starts_with("https://") || s.starts_with("http://")) && s.len() > "https://".len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = CampaignerConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CampaignerConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn zero_limits_fail_validation() {
        let mut config = CampaignerConfig::default();
        config.rate_limit.max_concurrency = 0;
        config.dispatch.max_attempts = 0;
        config.dispatch.worker_concurrency = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "all errors should be collected");
        assert!(has_error(&errors, "max_concurrency"));
        assert!(has_error(&errors, "max_attempts"));
        assert!(has_error(&errors, "worker_concurrency"));
    }

    #[test]
    fn zero_daily_limit_is_allowed() {
        // A zero quota pauses all sending without stopping the service.
        let mut config = CampaignerConfig::default();
        config.quota.daily_limit = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn lease_shorter_than_provider_timeout_fails() {
        let mut config = CampaignerConfig::default();
        config.dispatch.claim_lease_secs = 10;
        config.provider.timeout_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "claim_lease_secs"));
    }

    #[test]
    fn non_http_urls_fail_validation() {
        let mut config = CampaignerConfig::default();
        config.provider.endpoint = "ftp://mail".to_string();
        config.content.unsubscribe_base_url = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "provider.endpoint"));
        assert!(has_error(&errors, "unsubscribe_base_url"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = CampaignerConfig::default();
        config.service.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "log_level"));
    }
}
