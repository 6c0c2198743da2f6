// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Campaigner dispatch engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Campaigner configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignerConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Daily sending quota.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Provider-side throttling limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Batch dispatch policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Outbound delivery provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Rendered content defaults (sender, compliance footer).
    #[serde(default)]
    pub content: ContentConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, included in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "campaigner".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("campaigner").join("campaigner.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "campaigner.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Daily sending quota.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Maximum messages handed to the provider per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

fn default_daily_limit() -> u32 {
    500
}

/// Provider-side throttling, independent of the daily quota.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed per rolling window.
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    /// Length of the rolling window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum provider calls in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Minimum spacing between consecutive provider calls, in milliseconds.
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            max_concurrency: default_max_concurrency(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

fn default_requests_per_window() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    5
}

fn default_min_spacing_ms() -> u64 {
    100
}

/// Batch dispatch policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Due campaigns processed per tick, oldest `scheduled_at` first.
    #[serde(default = "default_campaigns_per_tick")]
    pub campaigns_per_tick: u32,

    /// Upper bound on recipients claimed for one campaign in one tick.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,

    /// Recipients processed concurrently within a batch.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Total delivery attempts per recipient before it is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deferral after a provider failure, in seconds.
    #[serde(default = "default_deferral_secs")]
    pub retry_deferral_secs: u64,

    /// Deferral after the daily quota runs out mid-batch, in seconds.
    #[serde(default = "default_deferral_secs")]
    pub quota_deferral_secs: u64,

    /// Age after which an unreleased claim is treated as abandoned.
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,

    /// Soft wall-clock budget per tick; no new campaigns are started after it elapses.
    #[serde(default = "default_tick_budget_secs")]
    pub tick_budget_secs: u64,

    /// Interval between ticks when running `campaigner serve`.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            campaigns_per_tick: default_campaigns_per_tick(),
            max_batch_size: default_max_batch_size(),
            worker_concurrency: default_worker_concurrency(),
            max_attempts: default_max_attempts(),
            retry_deferral_secs: default_deferral_secs(),
            quota_deferral_secs: default_deferral_secs(),
            claim_lease_secs: default_claim_lease_secs(),
            tick_budget_secs: default_tick_budget_secs(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl DispatchConfig {
    pub fn retry_deferral(&self) -> Duration {
        Duration::from_secs(self.retry_deferral_secs)
    }

    pub fn quota_deferral(&self) -> Duration {
        Duration::from_secs(self.quota_deferral_secs)
    }

    pub fn claim_lease(&self) -> Duration {
        Duration::from_secs(self.claim_lease_secs)
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs(self.tick_budget_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

fn default_campaigns_per_tick() -> u32 {
    5
}

fn default_max_batch_size() -> u32 {
    500
}

fn default_worker_concurrency() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_deferral_secs() -> u64 {
    3600
}

fn default_claim_lease_secs() -> u64 {
    900
}

fn default_tick_budget_secs() -> u64 {
    600
}

fn default_tick_interval_secs() -> u64 {
    3600
}

/// Outbound delivery provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// HTTPS endpoint that accepts one JSON message per POST.
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,

    /// Bearer token. `None` requires the `CAMPAIGNER_PROVIDER_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            api_key: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_provider_endpoint() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

/// Rendered content defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// Sender used when a campaign does not set its own.
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Base URL of the unsubscribe page linked from the compliance footer.
    #[serde(default = "default_unsubscribe_base_url")]
    pub unsubscribe_base_url: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            from_address: default_from_address(),
            unsubscribe_base_url: default_unsubscribe_base_url(),
        }
    }
}

fn default_from_address() -> String {
    "noreply@example.com".to_string()
}

fn default_unsubscribe_base_url() -> String {
    "https://example.com/unsubscribe".to_string()
}
