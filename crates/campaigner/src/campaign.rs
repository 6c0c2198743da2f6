// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign management, manual ticks, and quota inspection.

use std::path::{Path, PathBuf};

use campaigner_config::model::CampaignerConfig;
use campaigner_core::{
    Campaign, CampaignStatus, CampaignerError, NewCampaign, RecipientStatus, quota_period,
};
use campaigner_dispatch::{QuotaLedger, TickReport};
use campaigner_storage::queries::{campaigns, recipients};
use campaigner_storage::{CampaignStats, Database, NewRecipient};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::app;

#[derive(Subcommand, Debug)]
pub enum CampaignCommand {
    /// Create a draft campaign.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        /// File holding the HTML body; `{name}` and `{email}` are substituted.
        #[arg(long)]
        body_file: PathBuf,
        /// Sender address; defaults to `content.from_address`.
        #[arg(long)]
        from: Option<String>,
        /// Recipient list, one `address[,name]` per line.
        #[arg(long)]
        recipients: Option<PathBuf>,
    },
    /// Add recipients to a draft or scheduled campaign.
    AddRecipients { id: String, file: PathBuf },
    /// Schedule a campaign for an RFC 3339 instant.
    Schedule {
        id: String,
        #[arg(long)]
        at: DateTime<Utc>,
    },
    /// Cancel a draft or scheduled campaign.
    Cancel { id: String },
    /// Delete a campaign that is not sending or sent.
    Delete { id: String },
    /// List campaigns, optionally filtered by status.
    List {
        #[arg(long)]
        status: Option<CampaignStatus>,
    },
    /// Per-status recipient counts for one campaign.
    Stats {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run_campaign(
    config: &CampaignerConfig,
    command: CampaignCommand,
) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let now = Utc::now();
    match command {
        CampaignCommand::Create {
            name,
            subject,
            body_file,
            from,
            recipients: recipients_file,
        } => {
            let html_body = read_file(&body_file)?;
            let campaign = campaigns::create_campaign(
                &db,
                NewCampaign {
                    name,
                    subject,
                    html_body,
                    from_address: from,
                    target_tag: None,
                },
                now,
            )
            .await?;
            let added = match recipients_file {
                Some(path) => add_from_file(&db, &campaign.id, &path, now).await?,
                None => 0,
            };
            println!("{}  (draft, {added} recipients)", campaign.id);
        }
        CampaignCommand::AddRecipients { id, file } => {
            let added = add_from_file(&db, &id, &file, now).await?;
            println!("added {added} recipients to {id}");
        }
        CampaignCommand::Schedule { id, at } => {
            let campaign = campaigns::schedule_campaign(&db, &id, at, now).await?;
            println!("{} scheduled for {at}", campaign.id);
        }
        CampaignCommand::Cancel { id } => {
            campaigns::cancel_campaign(&db, &id, now).await?;
            println!("{id} cancelled");
        }
        CampaignCommand::Delete { id } => {
            campaigns::delete_campaign(&db, &id).await?;
            println!("{id} deleted");
        }
        CampaignCommand::List { status } => {
            for campaign in campaigns::list_campaigns(&db, status).await? {
                println!("{}", format_campaign_line(&campaign));
            }
        }
        CampaignCommand::Stats { id, json } => {
            let stats = campaigns::campaign_stats(&db, &id).await?;
            if json {
                println!("{}", stats_json(&stats));
            } else {
                print_stats(&stats);
            }
        }
    }
    db.close().await
}

async fn add_from_file(
    db: &Database,
    campaign_id: &str,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<usize, CampaignerError> {
    let list = parse_recipient_lines(&read_file(path)?);
    recipients::add_recipients(db, campaign_id, list, now).await
}

fn read_file(path: &Path) -> Result<String, CampaignerError> {
    std::fs::read_to_string(path).map_err(|e| {
        CampaignerError::Validation(format!("cannot read {}: {e}", path.display()))
    })
}

/// Parse `address[,name]` lines; blank lines and `#` comments are skipped.
pub fn parse_recipient_lines(content: &str) -> Vec<NewRecipient> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(',') {
            Some((address, name)) if !name.trim().is_empty() => {
                NewRecipient::new(address.trim()).with_name(name.trim())
            }
            Some((address, _)) => NewRecipient::new(address.trim()),
            None => NewRecipient::new(line),
        })
        .collect()
}

fn format_campaign_line(c: &Campaign) -> String {
    let when = c
        .scheduled_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {:<10} {:>6}/{:<6} failed {:<5} {}  {}",
        c.id, c.status, c.sent_count, c.recipient_count, c.failed_count, when, c.name
    )
}

const REPORTED_STATUSES: [RecipientStatus; 8] = [
    RecipientStatus::Pending,
    RecipientStatus::Sending,
    RecipientStatus::Sent,
    RecipientStatus::Delivered,
    RecipientStatus::Bounced,
    RecipientStatus::Unsubscribed,
    RecipientStatus::Complained,
    RecipientStatus::Failed,
];

fn print_stats(stats: &CampaignStats) {
    let c = &stats.campaign;
    println!("{}  {}  ({})", c.id, c.name, c.status);
    println!(
        "  recipients {}  sent {}  failed {}",
        c.recipient_count, c.sent_count, c.failed_count
    );
    for status in REPORTED_STATUSES {
        let count = stats.count(status);
        if count > 0 {
            println!("  {:<13}{count}", status.to_string());
        }
    }
}

fn stats_json(stats: &CampaignStats) -> serde_json::Value {
    serde_json::json!({
        "campaign": stats.campaign,
        "by_status": stats.by_status,
        "outstanding": stats.outstanding(),
    })
}

fn print_report(report: &TickReport, json: bool) -> Result<(), CampaignerError> {
    if json {
        let out = serde_json::to_string_pretty(report)
            .map_err(|e| CampaignerError::Internal(format!("failed to encode report: {e}")))?;
        println!("{out}");
    } else {
        println!(
            "campaigns {}  sent {}  suppressed {}  retried {}  failed {}  deferred {}",
            report.campaigns_processed,
            report.sent,
            report.suppressed,
            report.retried,
            report.failed,
            report.deferred,
        );
        for id in &report.campaigns_completed {
            println!("completed {id}");
        }
        if report.quota_exhausted {
            println!("daily quota exhausted");
        }
    }
    Ok(())
}

pub async fn run_tick(config: &CampaignerConfig, json: bool) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let dispatcher = app::build_dispatcher(config, db.clone())?;
    let report = dispatcher.tick().await?;
    print_report(&report, json)?;
    drop(dispatcher);
    db.close().await
}

pub async fn run_send_now(
    config: &CampaignerConfig,
    id: &str,
    json: bool,
) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let dispatcher = app::build_dispatcher(config, db.clone())?;
    let report = dispatcher.send_now(id).await?;
    print_report(&report, json)?;
    drop(dispatcher);
    db.close().await
}

pub async fn run_quota(config: &CampaignerConfig, json: bool) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let ledger = QuotaLedger::new(db.clone(), config.quota.daily_limit);
    let usage = ledger.usage(quota_period(Utc::now())).await?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "period": usage.period,
                "count": usage.count,
                "limit": usage.limit,
                "remaining": usage.remaining(),
            })
        );
    } else {
        println!(
            "{}: {}/{} sent, {} remaining",
            usage.period,
            usage.count,
            usage.limit,
            usage.remaining()
        );
    }
    drop(ledger);
    db.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaigner_test_utils::TestHarness;
    use campaigner_test_utils::harness::t0;

    #[test]
    fn parses_recipient_lines() {
        let list = parse_recipient_lines(
            "# exported list\n\
             a@x.com, Ann\n\
             \n\
             b@x.com\n\
             c@x.com,\n",
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address, "a@x.com");
        assert_eq!(list[0].name.as_deref(), Some("Ann"));
        assert_eq!(list[1].name, None);
        assert_eq!(list[2].address, "c@x.com");
        assert_eq!(list[2].name, None);
    }

    #[tokio::test]
    async fn stats_json_reports_outstanding() {
        let h = TestHarness::builder().with_daily_limit(1).build().await.unwrap();
        let c = h
            .scheduled_campaign(&["a@x.com", "b@x.com"], t0())
            .await
            .unwrap();
        h.dispatcher.tick_at(t0()).await.unwrap();

        let stats = campaigns::campaign_stats(&h.db, &c.id).await.unwrap();
        let value = stats_json(&stats);
        assert_eq!(value["outstanding"], 1);
        assert_eq!(value["by_status"]["sent"], 1);
        assert_eq!(value["campaign"]["status"], "sending");
    }

    #[tokio::test]
    async fn campaign_line_shows_progress() {
        let h = TestHarness::builder().build().await.unwrap();
        let c = h.draft_campaign(&["a@x.com"]).await.unwrap();
        let line = format_campaign_line(&c);
        assert!(line.starts_with(&c.id));
        assert!(line.contains("draft"));
        assert!(line.contains("0/1"));
    }
}
