// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Campaigner configuration system.

use campaigner_config::diagnostic::ConfigError;
use campaigner_config::model::CampaignerConfig;
use campaigner_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[service]
name = "campaigns-eu"
log_level = "debug"

[storage]
database_path = "/tmp/campaigner-test.db"
wal_mode = false

[quota]
daily_limit = 2000

[rate_limit]
requests_per_window = 600
window_secs = 60
max_concurrency = 8
min_spacing_ms = 20

[dispatch]
campaigns_per_tick = 3
max_batch_size = 250
worker_concurrency = 4
max_attempts = 5
retry_deferral_secs = 1800
quota_deferral_secs = 7200
claim_lease_secs = 600
tick_budget_secs = 300
tick_interval_secs = 900

[provider]
endpoint = "https://mail.example.net/send"
api_key = "sk-test"
timeout_secs = 10

[content]
from_address = "news@example.net"
unsubscribe_base_url = "https://example.net/u"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "campaigns-eu");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/campaigner-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.quota.daily_limit, 2000);
    assert_eq!(config.rate_limit.requests_per_window, 600);
    assert_eq!(config.rate_limit.max_concurrency, 8);
    assert_eq!(config.dispatch.campaigns_per_tick, 3);
    assert_eq!(config.dispatch.max_attempts, 5);
    assert_eq!(config.dispatch.retry_deferral_secs, 1800);
    assert_eq!(config.dispatch.quota_deferral_secs, 7200);
    assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.content.from_address, "news@example.net");
}

/// Unknown field in [quota] section is rejected.
#[test]
fn unknown_field_in_quota_produces_error() {
    let toml = r#"
[quota]
daily_limt = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("daily_limt"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown keys become diagnostics carrying a suggestion.
#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let toml = r#"
[dispatch]
max_atempts = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { key, suggestion, .. } if key == "max_atempts" => {
            suggestion.clone()
        }
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("max_attempts"));
}

/// Wrong value types are reported as InvalidType.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[quota]
daily_limit = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject string limit");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType for daily_limit, got: {errors:?}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "campaigner");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.quota.daily_limit, 500);
    assert_eq!(config.dispatch.campaigns_per_tick, 5);
    assert_eq!(config.dispatch.max_attempts, 3);
    assert!(config.provider.api_key.is_none());
    assert!(config.storage.wal_mode);
}

/// Dotted overrides (what the env provider produces) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[rate_limit]
max_concurrency = 2
"#;

    let config: CampaignerConfig = Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("rate_limit.max_concurrency", 9))
        .extract()
        .expect("should merge override");

    assert_eq!(config.rate_limit.max_concurrency, 9);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: CampaignerConfig = Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::file("/nonexistent/path/campaigner.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.service.name, "campaigner");
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[dispatch]
worker_concurrency = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero workers is invalid");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("worker_concurrency"))
    ));
}
