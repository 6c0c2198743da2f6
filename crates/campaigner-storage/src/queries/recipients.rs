// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient queue: population, exclusive batch claims, and outcome writes.
//!
//! SQLite has no `SKIP LOCKED`, so exclusivity comes from a claim token: one
//! conditional `UPDATE` stamps a fresh token on up to N eligible rows, then
//! the batch is read back by that token. Because all statements run on the
//! single connection thread, two claimants can never stamp the same row.

use campaigner_core::{CampaignerError, DeliveryEventKind, format_timestamp, normalize_address};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    ClaimedBatch, NewRecipient, RECIPIENT_COLUMNS, Recipient, RecipientOutcome, RecipientStatus,
    recipient_from_row,
};
use crate::queries::campaigns::load_campaign;

fn load_recipient(conn: &Connection, id: i64) -> rusqlite::Result<Option<Recipient>> {
    conn.query_row(
        &format!("SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id = ?1"),
        params![id],
        recipient_from_row,
    )
    .optional()
}

/// Add recipients to a `draft` or `scheduled` campaign.
///
/// Addresses are normalized; duplicates (within the input or already present)
/// are skipped. Returns the number of rows actually inserted.
pub async fn add_recipients(
    db: &Database,
    campaign_id: &str,
    recipients: Vec<NewRecipient>,
    now: DateTime<Utc>,
) -> Result<usize, CampaignerError> {
    let mut rows = Vec::with_capacity(recipients.len());
    for r in recipients {
        let address = normalize_address(&r.address);
        if !address.contains('@') {
            return Err(CampaignerError::Validation(format!(
                "invalid recipient address: {:?}",
                r.address
            )));
        }
        rows.push((address, r.name));
    }

    let campaign_id = campaign_id.to_string();
    let key = campaign_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<Result<usize, CampaignerError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let campaign = match load_campaign(&tx, &key)? {
                None => return Ok(Err(CampaignerError::not_found("campaign", &key))),
                Some(c) if !c.status.is_editable() => {
                    return Ok(Err(CampaignerError::Immutable {
                        campaign_id: key,
                        status: c.status.to_string(),
                    }));
                }
                Some(c) => c,
            };

            let ts = format_timestamp(now);
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO recipients (campaign_id, address, name, updated_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (address, name) in &rows {
                    inserted += stmt.execute(params![campaign.id, address, name, ts])?;
                }
            }
            tx.execute(
                "UPDATE campaigns SET recipient_count = \
                 (SELECT COUNT(*) FROM recipients WHERE campaign_id = ?1), updated_at = ?2 \
                 WHERE id = ?1",
                params![campaign.id, ts],
            )?;
            tx.commit()?;
            Ok(Ok(inserted))
        })
        .await
        .map_err(map_tr_err)??;

    tracing::debug!(campaign_id = %campaign_id, inserted, "recipients added");
    Ok(inserted)
}

/// Get a recipient by ID.
pub async fn get_recipient(db: &Database, id: i64) -> Result<Option<Recipient>, CampaignerError> {
    db.connection()
        .call(move |conn| load_recipient(conn, id))
        .await
        .map_err(map_tr_err)
}

/// All recipients of a campaign in insertion order.
pub async fn list_recipients(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<Recipient>, CampaignerError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE campaign_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![campaign_id], recipient_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `max_count` eligible recipients of a campaign.
///
/// Eligible means `pending`, not deferred past `now`, and either unclaimed or
/// holding a claim stamped at or before `stale_before` (an abandoned lease).
/// Claimed rows stay `pending` until [`mark_sending`].
pub async fn claim_batch(
    db: &Database,
    campaign_id: &str,
    max_count: u32,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> Result<ClaimedBatch, CampaignerError> {
    let claim_token = uuid::Uuid::new_v4().to_string();
    if max_count == 0 {
        return Ok(ClaimedBatch {
            claim_token,
            recipients: Vec::new(),
        });
    }

    let campaign_id = campaign_id.to_string();
    let token = claim_token.clone();
    let recipients = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE recipients SET claim_token = ?1, claimed_at = ?2, updated_at = ?2 \
                 WHERE id IN ( \
                     SELECT id FROM recipients \
                     WHERE campaign_id = ?3 AND status = 'pending' \
                       AND (scheduled_for IS NULL OR scheduled_for <= ?2) \
                       AND (claim_token IS NULL OR claimed_at <= ?4) \
                     ORDER BY id \
                     LIMIT ?5)",
                params![
                    token,
                    format_timestamp(now),
                    campaign_id,
                    format_timestamp(stale_before),
                    max_count,
                ],
            )?;
            let recipients = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE claim_token = ?1 ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![token], recipient_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;
            Ok(recipients)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(ClaimedBatch {
        claim_token,
        recipients,
    })
}

/// Move every row still held by the batch's token from `pending` to `sending`.
pub async fn mark_sending(
    db: &Database,
    batch: &ClaimedBatch,
    now: DateTime<Utc>,
) -> Result<usize, CampaignerError> {
    let token = batch.claim_token.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE recipients SET status = 'sending', updated_at = ?1 \
                 WHERE claim_token = ?2 AND status = 'pending'",
                params![format_timestamp(now), token],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Write the outcome for one claimed recipient and release its claim.
///
/// Campaign counters move in the same transaction. Returns `false` when the
/// recipient no longer holds `claim_token` (its lease was recovered), in which
/// case nothing is written.
pub async fn mark_outcome(
    db: &Database,
    recipient_id: i64,
    claim_token: &str,
    outcome: RecipientOutcome,
    now: DateTime<Utc>,
) -> Result<bool, CampaignerError> {
    let token = claim_token.to_string();
    let status = outcome.status().to_string();
    let attempt_inc: i64 = if outcome.counts_as_attempt() { 1 } else { 0 };
    let (error, scheduled_for, message_id, counter) = match outcome {
        RecipientOutcome::Sent {
            provider_message_id,
        } => (None, None, Some(provider_message_id), Some("sent_count")),
        RecipientOutcome::Suppressed { .. } => (None, None, None, None),
        RecipientOutcome::Retry { error, retry_at } => (Some(error), Some(retry_at), None, None),
        RecipientOutcome::Failed { error } => (Some(error), None, None, Some("failed_count")),
        RecipientOutcome::Deferred { until } => (None, Some(until), None, None),
    };
    let scheduled_for = scheduled_for.map(format_timestamp);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ts = format_timestamp(now);
            let changed = tx.execute(
                "UPDATE recipients SET status = ?1, attempt_count = attempt_count + ?2, \
                 last_error = COALESCE(?3, last_error), scheduled_for = ?4, \
                 provider_message_id = COALESCE(?5, provider_message_id), \
                 claim_token = NULL, claimed_at = NULL, updated_at = ?6 \
                 WHERE id = ?7 AND claim_token = ?8",
                params![
                    status,
                    attempt_inc,
                    error,
                    scheduled_for,
                    message_id,
                    ts,
                    recipient_id,
                    token
                ],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            if let Some(column) = counter {
                tx.execute(
                    &format!(
                        "UPDATE campaigns SET {column} = {column} + 1, updated_at = ?1 \
                         WHERE id = (SELECT campaign_id FROM recipients WHERE id = ?2)"
                    ),
                    params![ts, recipient_id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Push every unclaimed, currently eligible `pending` recipient of a campaign
/// out to `until`. Used when the daily quota runs out mid-pass so the rest of
/// the audience waits for the quota deferral instead of being re-polled.
pub async fn defer_unclaimed(
    db: &Database,
    campaign_id: &str,
    until: DateTime<Utc>,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> Result<usize, CampaignerError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let ts = format_timestamp(now);
            conn.execute(
                "UPDATE recipients SET scheduled_for = ?1, updated_at = ?2 \
                 WHERE campaign_id = ?3 AND status = 'pending' \
                   AND (scheduled_for IS NULL OR scheduled_for <= ?2) \
                   AND (claim_token IS NULL OR claimed_at <= ?4)",
                params![
                    format_timestamp(until),
                    ts,
                    campaign_id,
                    format_timestamp(stale_before)
                ],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Return recipients stuck in `sending` with a claim stamped at or before
/// `cutoff` to `pending`, releasing the claim. Returns how many were reset.
pub async fn recover_stale_sending(
    db: &Database,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<usize, CampaignerError> {
    let recovered = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE recipients SET status = 'pending', claim_token = NULL, \
                 claimed_at = NULL, updated_at = ?2 \
                 WHERE status = 'sending' AND claimed_at <= ?1",
                params![format_timestamp(cutoff), format_timestamp(now)],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if recovered > 0 {
        tracing::warn!(recovered, "reset recipients abandoned in sending");
    }
    Ok(recovered)
}

/// Apply a provider webhook event to the recipient that owns `provider_message_id`.
///
/// Only `sent` and `delivered` recipients change status; bounces and
/// complaints additionally suppress the address. Returns the recipient as it
/// stands after the event, or `None` if no recipient owns the message id.
pub async fn record_delivery_event(
    db: &Database,
    provider_message_id: &str,
    kind: DeliveryEventKind,
    now: DateTime<Utc>,
) -> Result<Option<Recipient>, CampaignerError> {
    let message_id = provider_message_id.to_string();
    let next = kind.recipient_status();
    let reason = kind.suppression_reason();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    &format!(
                        "SELECT {RECIPIENT_COLUMNS} FROM recipients \
                         WHERE provider_message_id = ?1"
                    ),
                    params![message_id],
                    recipient_from_row,
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };

            let ts = format_timestamp(now);
            let can_move = matches!(
                current.status,
                RecipientStatus::Sent | RecipientStatus::Delivered
            ) && current.status != next;
            if can_move {
                tx.execute(
                    "UPDATE recipients SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![next.to_string(), ts, current.id],
                )?;
            }
            if let Some(reason) = reason {
                tx.execute(
                    "INSERT INTO suppressions (address, reason, recorded_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(address) DO UPDATE SET reason = excluded.reason, \
                     recorded_at = excluded.recorded_at",
                    params![current.address, reason.to_string(), ts],
                )?;
            }
            let updated = load_recipient(&tx, current.id)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignStatus, NewCampaign};
    use crate::queries::campaigns::{
        begin_sending, campaign_stats, create_campaign, get_campaign, schedule_campaign,
    };
    use crate::queries::suppressions::lookup;
    use campaigner_core::SuppressionReason;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn lease_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(15)
    }

    async fn sending_campaign(db: &Database, addresses: &[&str]) -> String {
        let c = create_campaign(
            db,
            NewCampaign {
                name: "test".into(),
                subject: "s".into(),
                html_body: "b".into(),
                ..Default::default()
            },
            t0(),
        )
        .await
        .unwrap();
        let recipients = addresses.iter().map(|a| NewRecipient::new(*a)).collect();
        add_recipients(db, &c.id, recipients, t0()).await.unwrap();
        schedule_campaign(db, &c.id, t0(), t0()).await.unwrap();
        begin_sending(db, &c.id, t0()).await.unwrap();
        c.id
    }

    #[tokio::test]
    async fn add_recipients_normalizes_and_skips_duplicates() {
        let (db, _dir) = setup_db().await;
        let c = create_campaign(
            &db,
            NewCampaign {
                name: "n".into(),
                subject: "s".into(),
                ..Default::default()
            },
            t0(),
        )
        .await
        .unwrap();

        let first = vec![
            NewRecipient::new("A@X.com").with_name("Ann"),
            NewRecipient::new("a@x.com "),
            NewRecipient::new("b@x.com"),
        ];
        assert_eq!(add_recipients(&db, &c.id, first, t0()).await.unwrap(), 2);
        let again = vec![NewRecipient::new("b@x.com"), NewRecipient::new("c@x.com")];
        assert_eq!(add_recipients(&db, &c.id, again, t0()).await.unwrap(), 1);

        let campaign = get_campaign(&db, &c.id).await.unwrap().unwrap();
        assert_eq!(campaign.recipient_count, 3);

        let all = list_recipients(&db, &c.id).await.unwrap();
        assert_eq!(all[0].address, "a@x.com");
        assert_eq!(all[0].name.as_deref(), Some("Ann"));
        assert!(all.iter().all(|r| r.status == RecipientStatus::Pending));
    }

    #[tokio::test]
    async fn add_recipients_rejected_once_sending() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com"]).await;
        let err = add_recipients(&db, &id, vec![NewRecipient::new("z@x.com")], t0())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignerError::Immutable { .. }));

        let err = add_recipients(&db, "missing", vec![NewRecipient::new("z@x.com")], t0())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn add_recipients_rejects_malformed_address() {
        let (db, _dir) = setup_db().await;
        let err = add_recipients(&db, "any", vec![NewRecipient::new("nobody")], t0())
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignerError::Validation(_)));
    }

    #[tokio::test]
    async fn claim_batch_respects_max_and_leaves_pending() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com", "b@x.com", "c@x.com"]).await;

        let batch = claim_batch(&db, &id, 2, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        for r in &batch.recipients {
            assert_eq!(r.status, RecipientStatus::Pending);
            assert_eq!(r.claim_token.as_deref(), Some(batch.claim_token.as_str()));
        }

        // Only the unclaimed recipient is left for a second claimant.
        let second = claim_batch(&db, &id, 10, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.recipients[0].address, "c@x.com");

        let empty = claim_batch(&db, &id, 0, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn concurrent_claims_are_disjoint() {
        let (db, _dir) = setup_db().await;
        let addresses: Vec<String> = (0..50).map(|i| format!("r{i}@x.com")).collect();
        let refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
        let id = sending_campaign(&db, &refs).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                claim_batch(&db, &id, 10, t0(), lease_cutoff(t0()))
                    .await
                    .unwrap()
            }));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            let batch = handle.await.unwrap();
            total += batch.len();
            for r in batch.recipients {
                assert!(seen.insert(r.id), "recipient {} claimed twice", r.id);
            }
        }
        assert_eq!(total, 50);
    }

    #[tokio::test]
    async fn deferred_recipients_not_claimable_until_due() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com"]).await;
        let batch = claim_batch(&db, &id, 1, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        let r = &batch.recipients[0];
        let until = t0() + Duration::hours(1);
        assert!(
            mark_outcome(
                &db,
                r.id,
                &batch.claim_token,
                RecipientOutcome::Deferred { until },
                t0()
            )
            .await
            .unwrap()
        );

        let now = t0() + Duration::minutes(30);
        assert!(
            claim_batch(&db, &id, 1, now, lease_cutoff(now))
                .await
                .unwrap()
                .is_empty()
        );
        let later = until;
        let again = claim_batch(&db, &id, 1, later, lease_cutoff(later))
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again.recipients[0].attempt_count, 0);
    }

    #[tokio::test]
    async fn defer_unclaimed_skips_claimed_rows() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com", "b@x.com", "c@x.com"]).await;
        let batch = claim_batch(&db, &id, 1, t0(), lease_cutoff(t0()))
            .await
            .unwrap();

        let until = t0() + Duration::hours(1);
        let deferred = defer_unclaimed(&db, &id, until, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert_eq!(deferred, 2);

        let claimed = get_recipient(&db, batch.recipients[0].id)
            .await
            .unwrap()
            .unwrap();
        assert!(claimed.scheduled_for.is_none());
        let rest: Vec<_> = list_recipients(&db, &id)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.id != claimed.id)
            .collect();
        assert!(rest.iter().all(|r| r.scheduled_for == Some(until)));
    }

    #[tokio::test]
    async fn abandoned_claim_is_reclaimable_after_lease() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com"]).await;
        let first = claim_batch(&db, &id, 1, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let soon = t0() + Duration::minutes(5);
        assert!(
            claim_batch(&db, &id, 1, soon, lease_cutoff(soon))
                .await
                .unwrap()
                .is_empty()
        );

        let later = t0() + Duration::minutes(20);
        let second = claim_batch(&db, &id, 1, later, lease_cutoff(later))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_ne!(second.claim_token, first.claim_token);

        // The stale token can no longer write an outcome.
        let stale = mark_outcome(
            &db,
            first.recipients[0].id,
            &first.claim_token,
            RecipientOutcome::Failed {
                error: "late".into(),
            },
            later,
        )
        .await
        .unwrap();
        assert!(!stale);
    }

    #[tokio::test]
    async fn outcomes_update_recipient_and_counters() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com", "b@x.com", "c@x.com"]).await;
        let batch = claim_batch(&db, &id, 3, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        assert_eq!(mark_sending(&db, &batch, t0()).await.unwrap(), 3);
        let [a, b, c] = [
            batch.recipients[0].id,
            batch.recipients[1].id,
            batch.recipients[2].id,
        ];
        let token = batch.claim_token.as_str();

        mark_outcome(
            &db,
            a,
            token,
            RecipientOutcome::Sent {
                provider_message_id: "msg-a".into(),
            },
            t0(),
        )
        .await
        .unwrap();
        mark_outcome(
            &db,
            b,
            token,
            RecipientOutcome::Failed {
                error: "rejected".into(),
            },
            t0(),
        )
        .await
        .unwrap();
        mark_outcome(
            &db,
            c,
            token,
            RecipientOutcome::Retry {
                error: "503".into(),
                retry_at: t0() + Duration::hours(1),
            },
            t0(),
        )
        .await
        .unwrap();

        let sent = get_recipient(&db, a).await.unwrap().unwrap();
        assert_eq!(sent.status, RecipientStatus::Sent);
        assert_eq!(sent.provider_message_id.as_deref(), Some("msg-a"));
        assert_eq!(sent.attempt_count, 1);
        assert!(sent.claim_token.is_none());

        let failed = get_recipient(&db, b).await.unwrap().unwrap();
        assert_eq!(failed.status, RecipientStatus::Failed);
        assert_eq!(failed.last_error.as_deref(), Some("rejected"));

        let retry = get_recipient(&db, c).await.unwrap().unwrap();
        assert_eq!(retry.status, RecipientStatus::Pending);
        assert_eq!(retry.attempt_count, 1);
        assert_eq!(retry.scheduled_for, Some(t0() + Duration::hours(1)));

        let stats = campaign_stats(&db, &id).await.unwrap();
        assert_eq!(stats.campaign.sent_count, 1);
        assert_eq!(stats.campaign.failed_count, 1);
        assert_eq!(stats.campaign.status, CampaignStatus::Sending);
    }

    #[tokio::test]
    async fn recover_stale_sending_resets_only_old_claims() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com", "b@x.com"]).await;
        let old = claim_batch(&db, &id, 1, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        mark_sending(&db, &old, t0()).await.unwrap();

        let fresh_at = t0() + Duration::minutes(14);
        let fresh = claim_batch(&db, &id, 1, fresh_at, lease_cutoff(fresh_at))
            .await
            .unwrap();
        mark_sending(&db, &fresh, fresh_at).await.unwrap();

        let now = t0() + Duration::minutes(16);
        let recovered = recover_stale_sending(&db, lease_cutoff(now), now)
            .await
            .unwrap();
        assert_eq!(recovered, 1);

        let reset = get_recipient(&db, old.recipients[0].id).await.unwrap().unwrap();
        assert_eq!(reset.status, RecipientStatus::Pending);
        assert!(reset.claim_token.is_none());
        let held = get_recipient(&db, fresh.recipients[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(held.status, RecipientStatus::Sending);
    }

    #[tokio::test]
    async fn bounce_event_updates_status_and_suppresses() {
        let (db, _dir) = setup_db().await;
        let id = sending_campaign(&db, &["a@x.com"]).await;
        let batch = claim_batch(&db, &id, 1, t0(), lease_cutoff(t0()))
            .await
            .unwrap();
        mark_outcome(
            &db,
            batch.recipients[0].id,
            &batch.claim_token,
            RecipientOutcome::Sent {
                provider_message_id: "msg-1".into(),
            },
            t0(),
        )
        .await
        .unwrap();

        let delivered = record_delivery_event(&db, "msg-1", DeliveryEventKind::Delivered, t0())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.status, RecipientStatus::Delivered);

        let bounced = record_delivery_event(&db, "msg-1", DeliveryEventKind::Bounced, t0())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bounced.status, RecipientStatus::Bounced);
        let entry = lookup(&db, "a@x.com").await.unwrap().unwrap();
        assert_eq!(entry.reason, SuppressionReason::Bounce);

        // Terminal failure statuses are not overwritten by late events.
        let late = record_delivery_event(&db, "msg-1", DeliveryEventKind::Delivered, t0())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(late.status, RecipientStatus::Bounced);

        assert!(
            record_delivery_event(&db, "unknown", DeliveryEventKind::Bounced, t0())
                .await
                .unwrap()
                .is_none()
        );
    }
}
