// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./campaigner.toml` > `~/.config/campaigner/campaigner.toml`
//! > `/etc/campaigner/campaigner.toml` with environment variable overrides via
//! `CAMPAIGNER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CampaignerConfig;

/// Config sections addressable from `CAMPAIGNER_<SECTION>_<KEY>` env vars.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "quota",
    "rate_limit",
    "dispatch",
    "provider",
    "content",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/campaigner/campaigner.toml` (system-wide)
/// 3. `~/.config/campaigner/campaigner.toml` (user XDG config)
/// 4. `./campaigner.toml` (local directory)
/// 5. `CAMPAIGNER_*` environment variables
pub fn load_config() -> Result<CampaignerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CampaignerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CampaignerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::file("/etc/campaigner/campaigner.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("campaigner/campaigner.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("campaigner.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because both section and key
/// names contain underscores: `CAMPAIGNER_RATE_LIMIT_MAX_CONCURRENCY` must map
/// to `rate_limit.max_concurrency`.
fn env_provider() -> Env {
    Env::prefixed("CAMPAIGNER_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    // Longest section first so `rate_limit_` is not shadowed by a shorter prefix.
    let mut sections: Vec<&str> = ENV_SECTIONS.to_vec();
    sections.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for section in sections {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("quota_daily_limit"), "quota.daily_limit");
        assert_eq!(
            map_env_key("rate_limit_max_concurrency"),
            "rate_limit.max_concurrency"
        );
        assert_eq!(map_env_key("provider_api_key"), "provider.api_key");
        assert_eq!(
            map_env_key("dispatch_retry_deferral_secs"),
            "dispatch.retry_deferral_secs"
        );
        assert_eq!(map_env_key("unknown"), "unknown");
    }
}
