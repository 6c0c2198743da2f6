// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `campaigner doctor` command implementation.
//!
//! Runs diagnostic checks against the configured database and provider
//! settings to surface problems before `serve` is started.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use campaigner_config::model::CampaignerConfig;
use campaigner_core::{CampaignerError, HealthStatus, quota_period};
use campaigner_dispatch::QuotaLedger;
use campaigner_storage::Database;
use campaigner_storage::queries::campaigns;
use chrono::Utc;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `campaigner doctor` command. `--plain` disables colored output.
pub async fn run_doctor(config: &CampaignerConfig, plain: bool) -> Result<(), CampaignerError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = run_checks(config).await;

    println!();
    println!("  campaigner doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_line(result, use_color));
    }

    println!();
    match issues {
        0 => println!("  All checks passed."),
        1 => println!("  1 issue found."),
        n => println!("  {n} issues found."),
    }
    println!();
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Every check, in display order.
pub async fn run_checks(config: &CampaignerConfig) -> Vec<CheckResult> {
    let mut results = vec![check_provider(config)];

    let start = Instant::now();
    match Database::open_with(&config.storage.database_path, config.storage.wal_mode).await {
        Ok(db) => {
            results.push(check_database(&db, start).await);
            results.push(check_quota(&db, config.quota.daily_limit).await);
            results.push(check_due_campaigns(&db).await);
            let _ = db.close().await;
        }
        Err(e) => results.push(CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        )),
    }
    results
}

fn check_provider(config: &CampaignerConfig) -> CheckResult {
    let start = Instant::now();
    let endpoint = match reqwest::Url::parse(&config.provider.endpoint) {
        Ok(url) => url,
        Err(e) => {
            return CheckResult::new(
                "Provider",
                CheckStatus::Fail,
                format!("invalid endpoint: {e}"),
                start,
            );
        }
    };
    if config.provider.api_key.is_none() {
        return CheckResult::new(
            "Provider",
            CheckStatus::Fail,
            "no API key (set provider.api_key or CAMPAIGNER_PROVIDER_API_KEY)",
            start,
        );
    }
    if endpoint.scheme() != "https" {
        return CheckResult::new(
            "Provider",
            CheckStatus::Warn,
            format!("endpoint is not HTTPS: {endpoint}"),
            start,
        );
    }
    CheckResult::new(
        "Provider",
        CheckStatus::Pass,
        endpoint.host_str().unwrap_or("configured").to_string(),
        start,
    )
}

async fn check_database(db: &Database, start: Instant) -> CheckResult {
    match db.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Ok(HealthStatus::Degraded(msg)) => CheckResult::new("Database", CheckStatus::Warn, msg, start),
        Ok(HealthStatus::Unhealthy(msg)) => CheckResult::new("Database", CheckStatus::Fail, msg, start),
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

async fn check_quota(db: &Database, daily_limit: u32) -> CheckResult {
    let start = Instant::now();
    let ledger = QuotaLedger::new(db.clone(), daily_limit);
    match ledger.usage(quota_period(Utc::now())).await {
        Ok(usage) if usage.limit == 0 => {
            CheckResult::new("Quota", CheckStatus::Warn, "daily limit is 0", start)
        }
        Ok(usage) if usage.remaining() == 0 => CheckResult::new(
            "Quota",
            CheckStatus::Warn,
            format!("exhausted for {} ({}/{})", usage.period, usage.count, usage.limit),
            start,
        ),
        Ok(usage) => CheckResult::new(
            "Quota",
            CheckStatus::Pass,
            format!("{}/{} used today", usage.count, usage.limit),
            start,
        ),
        Err(e) => CheckResult::new("Quota", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_due_campaigns(db: &Database) -> CheckResult {
    let start = Instant::now();
    match campaigns::due_campaigns(db, Utc::now(), u32::MAX).await {
        Ok(due) => CheckResult::new(
            "Due campaigns",
            CheckStatus::Pass,
            format!("{} waiting for a tick", due.len()),
            start,
        ),
        Err(e) => CheckResult::new("Due campaigns", CheckStatus::Fail, e.to_string(), start),
    }
}
