// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression list operations. Addresses are stored normalized.

use campaigner_core::{CampaignerError, format_timestamp, normalize_address};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{SuppressionEntry, get_enum, get_ts};

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<SuppressionEntry> {
    Ok(SuppressionEntry {
        address: row.get(0)?,
        reason: get_enum(row, 1)?,
        recorded_at: get_ts(row, 2)?,
    })
}

/// Add or refresh a suppression. Idempotent; the latest reason wins.
pub async fn suppress(
    db: &Database,
    address: &str,
    reason: campaigner_core::SuppressionReason,
    now: DateTime<Utc>,
) -> Result<SuppressionEntry, CampaignerError> {
    let address = normalize_address(address);
    if address.is_empty() {
        return Err(CampaignerError::Validation(
            "suppression address must not be empty".into(),
        ));
    }
    let entry = SuppressionEntry {
        address,
        reason,
        recorded_at: now,
    };
    let row = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO suppressions (address, reason, recorded_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(address) DO UPDATE SET reason = excluded.reason, \
                 recorded_at = excluded.recorded_at",
                params![
                    row.address,
                    row.reason.to_string(),
                    format_timestamp(row.recorded_at)
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    tracing::info!(address = %entry.address, reason = %entry.reason, "address suppressed");
    Ok(entry)
}

/// Remove a suppression. Returns `false` if the address was not suppressed.
pub async fn unsuppress(db: &Database, address: &str) -> Result<bool, CampaignerError> {
    let address = normalize_address(address);
    let removed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM suppressions WHERE address = ?1",
                params![address],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(removed > 0)
}

/// Look up the suppression entry for an address, if any.
pub async fn lookup(
    db: &Database,
    address: &str,
) -> Result<Option<SuppressionEntry>, CampaignerError> {
    let address = normalize_address(address);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT address, reason, recorded_at FROM suppressions WHERE address = ?1",
                params![address],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All suppressions, most recent first.
pub async fn list(db: &Database) -> Result<Vec<SuppressionEntry>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT address, reason, recorded_at FROM suppressions \
                 ORDER BY recorded_at DESC, address",
            )?;
            let rows = stmt.query_map([], entry_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaigner_core::SuppressionReason;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let db = Database::open_in_memory().await.unwrap();
        suppress(&db, "A@X.com", SuppressionReason::Unsubscribe, t0())
            .await
            .unwrap();

        let entry = lookup(&db, " a@x.COM").await.unwrap().unwrap();
        assert_eq!(entry.address, "a@x.com");
        assert_eq!(entry.reason, SuppressionReason::Unsubscribe);
        assert!(lookup(&db, "b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn suppress_is_idempotent_upsert() {
        let db = Database::open_in_memory().await.unwrap();
        suppress(&db, "a@x.com", SuppressionReason::Bounce, t0())
            .await
            .unwrap();
        let later = t0() + Duration::days(1);
        suppress(&db, "a@x.com", SuppressionReason::Complaint, later)
            .await
            .unwrap();

        let all = list(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].reason, SuppressionReason::Complaint);
        assert_eq!(all[0].recorded_at, later);
    }

    #[tokio::test]
    async fn unsuppress_removes_entry() {
        let db = Database::open_in_memory().await.unwrap();
        suppress(&db, "a@x.com", SuppressionReason::Unsubscribe, t0())
            .await
            .unwrap();
        assert!(unsuppress(&db, "A@x.com").await.unwrap());
        assert!(!unsuppress(&db, "a@x.com").await.unwrap());
        assert!(lookup(&db, "a@x.com").await.unwrap().is_none());
    }
}
