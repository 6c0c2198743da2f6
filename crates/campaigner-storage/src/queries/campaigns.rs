// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign lifecycle persistence.
//!
//! Every status change is a conditional `UPDATE ... WHERE status IN (...)`, so
//! a transition the state machine forbids simply matches no row. The caller
//! then reloads the campaign to tell "missing" apart from "wrong status".

use std::collections::BTreeMap;

use campaigner_core::{CampaignerError, format_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    CAMPAIGN_COLUMNS, Campaign, CampaignStats, CampaignStatus, NewCampaign, campaign_from_row,
};

/// Result of a status-guarded write.
enum Guarded {
    Applied(Campaign),
    Rejected(Campaign),
    Missing,
}

pub(crate) fn load_campaign(conn: &Connection, id: &str) -> rusqlite::Result<Option<Campaign>> {
    conn.query_row(
        &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
        params![id],
        campaign_from_row,
    )
    .optional()
}

fn guarded(conn: &Connection, id: &str, changed: usize) -> rusqlite::Result<Guarded> {
    Ok(match load_campaign(conn, id)? {
        None => Guarded::Missing,
        Some(c) if changed > 0 => Guarded::Applied(c),
        Some(c) => Guarded::Rejected(c),
    })
}

fn into_edit(id: &str, guard: Guarded) -> Result<Campaign, CampaignerError> {
    match guard {
        Guarded::Applied(c) => Ok(c),
        Guarded::Rejected(c) => Err(CampaignerError::Immutable {
            campaign_id: id.to_string(),
            status: c.status.to_string(),
        }),
        Guarded::Missing => Err(CampaignerError::not_found("campaign", id)),
    }
}

fn into_transition(
    id: &str,
    to: CampaignStatus,
    guard: Guarded,
) -> Result<Campaign, CampaignerError> {
    match guard {
        Guarded::Applied(c) => Ok(c),
        Guarded::Rejected(c) => Err(CampaignerError::InvalidTransition {
            from: c.status.to_string(),
            to: to.to_string(),
        }),
        Guarded::Missing => Err(CampaignerError::not_found("campaign", id)),
    }
}

/// Insert a new campaign in `draft`.
pub async fn create_campaign(
    db: &Database,
    new: NewCampaign,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignerError> {
    if new.name.trim().is_empty() {
        return Err(CampaignerError::Validation(
            "campaign name must not be empty".into(),
        ));
    }
    if new.subject.trim().is_empty() {
        return Err(CampaignerError::Validation(
            "campaign subject must not be empty".into(),
        ));
    }

    let campaign = Campaign {
        id: uuid::Uuid::new_v4().to_string(),
        name: new.name,
        subject: new.subject,
        html_body: new.html_body,
        from_address: new.from_address,
        target_tag: new.target_tag,
        status: CampaignStatus::Draft,
        scheduled_at: None,
        sent_at: None,
        completed_at: None,
        recipient_count: 0,
        sent_count: 0,
        failed_count: 0,
        created_at: now,
        updated_at: now,
    };

    let row = campaign.clone();
    db.connection()
        .call(move |conn| {
            let ts = format_timestamp(row.created_at);
            conn.execute(
                "INSERT INTO campaigns (id, name, subject, html_body, from_address, target_tag, \
                 status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    row.id,
                    row.name,
                    row.subject,
                    row.html_body,
                    row.from_address,
                    row.target_tag,
                    row.status.to_string(),
                    ts,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

    tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "campaign created");
    Ok(campaign)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, CampaignerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| load_campaign(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// List campaigns, newest first, optionally filtered by status.
pub async fn list_campaigns(
    db: &Database,
    status: Option<CampaignStatus>,
) -> Result<Vec<Campaign>, CampaignerError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
                 WHERE ?1 IS NULL OR status = ?1 \
                 ORDER BY created_at DESC, id"
            ))?;
            let rows = stmt.query_map(params![status], campaign_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace subject and/or body. Only `draft` and `scheduled` campaigns are editable.
pub async fn update_content(
    db: &Database,
    id: &str,
    subject: Option<String>,
    html_body: Option<String>,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignerError> {
    if subject.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(CampaignerError::Validation(
            "campaign subject must not be empty".into(),
        ));
    }
    let id = id.to_string();
    let key = id.clone();
    let guard = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET subject = COALESCE(?1, subject), \
                 html_body = COALESCE(?2, html_body), updated_at = ?3 \
                 WHERE id = ?4 AND status IN ('draft', 'scheduled')",
                params![subject, html_body, format_timestamp(now), key],
            )?;
            guarded(conn, &key, changed)
        })
        .await
        .map_err(map_tr_err)?;
    into_edit(&id, guard)
}

/// Set the send time, moving `draft` to `scheduled`. Rescheduling a
/// scheduled campaign just moves its send time.
pub async fn schedule_campaign(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignerError> {
    let id = id.to_string();
    let key = id.clone();
    let guard = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'scheduled', scheduled_at = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND status IN ('draft', 'scheduled')",
                params![format_timestamp(at), format_timestamp(now), key],
            )?;
            guarded(conn, &key, changed)
        })
        .await
        .map_err(map_tr_err)?;
    let campaign = into_transition(&id, CampaignStatus::Scheduled, guard)?;
    tracing::info!(campaign_id = %id, scheduled_at = %at, "campaign scheduled");
    Ok(campaign)
}

/// Cancel a `draft` or `scheduled` campaign. Never allowed once sending.
pub async fn cancel_campaign(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Campaign, CampaignerError> {
    let id = id.to_string();
    let key = id.clone();
    let guard = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'cancelled', updated_at = ?1 \
                 WHERE id = ?2 AND status IN ('draft', 'scheduled')",
                params![format_timestamp(now), key],
            )?;
            guarded(conn, &key, changed)
        })
        .await
        .map_err(map_tr_err)?;
    let campaign = into_transition(&id, CampaignStatus::Cancelled, guard)?;
    tracing::info!(campaign_id = %id, "campaign cancelled");
    Ok(campaign)
}

/// Delete a campaign and (via cascade) its recipients.
///
/// Rejected once the campaign is `sending` or `sent`.
pub async fn delete_campaign(db: &Database, id: &str) -> Result<(), CampaignerError> {
    let id = id.to_string();
    let key = id.clone();
    let rejected = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM campaigns WHERE id = ?1 \
                 AND status IN ('draft', 'scheduled', 'cancelled')",
                params![key],
            )?;
            if changed > 0 {
                return Ok(Some(None));
            }
            Ok(load_campaign(conn, &key)?.map(|c| Some(c.status)))
        })
        .await
        .map_err(map_tr_err)?;

    match rejected {
        Some(None) => {
            tracing::info!(campaign_id = %id, "campaign deleted");
            Ok(())
        }
        Some(Some(status)) => Err(CampaignerError::Immutable {
            campaign_id: id,
            status: status.to_string(),
        }),
        None => Err(CampaignerError::not_found("campaign", id)),
    }
}

/// Campaigns the dispatcher should work on at `now`, oldest send time first.
pub async fn due_campaigns(
    db: &Database,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Campaign>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
                 WHERE status IN ('scheduled', 'sending') \
                   AND scheduled_at IS NOT NULL AND scheduled_at <= ?1 \
                 ORDER BY scheduled_at ASC, created_at ASC \
                 LIMIT ?2"
            ))?;
            let rows =
                stmt.query_map(params![format_timestamp(now), limit], campaign_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// First touch by the dispatcher: `scheduled → sending`, stamping `sent_at`.
///
/// Returns `false` when the campaign was not `scheduled` (already sending,
/// or cancelled in the meantime).
pub async fn begin_sending(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, CampaignerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let ts = format_timestamp(now);
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'sending', sent_at = COALESCE(sent_at, ?1), \
                 updated_at = ?1 WHERE id = ?2 AND status = 'scheduled'",
                params![ts, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Completion detection: `sending → sent` once no recipient is pending or sending.
///
/// A single conditional statement, so re-running it is a no-op and a
/// campaign with zero recipients completes on its first pass.
pub async fn complete_if_drained(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, CampaignerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let ts = format_timestamp(now);
            let changed = conn.execute(
                "UPDATE campaigns SET status = 'sent', completed_at = ?1, updated_at = ?1 \
                 WHERE id = ?2 AND status = 'sending' \
                   AND NOT EXISTS (SELECT 1 FROM recipients \
                                   WHERE campaign_id = ?2 AND status IN ('pending', 'sending'))",
                params![ts, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Per-status recipient counts plus the campaign's own counters.
pub async fn campaign_stats(db: &Database, id: &str) -> Result<CampaignStats, CampaignerError> {
    let id = id.to_string();
    let key = id.clone();
    let stats = db
        .connection()
        .call(move |conn| {
            let Some(campaign) = load_campaign(conn, &key)? else {
                return Ok(None);
            };
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM recipients WHERE campaign_id = ?1 GROUP BY status",
            )?;
            let by_status = stmt
                .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<BTreeMap<String, i64>>>()?;
            Ok(Some(CampaignStats {
                campaign,
                by_status,
            }))
        })
        .await
        .map_err(map_tr_err)?;
    stats.ok_or_else(|| CampaignerError::not_found("campaign", id))
}
