// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily quota ledger.
//!
//! One row per UTC day. `count` only ever moves through the conditional
//! increment in [`try_claim`], which is what keeps `count <= limit_value`.

use campaigner_core::{CampaignerError, QuotaUsage, format_timestamp};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn period_key(period: NaiveDate) -> String {
    period.format("%Y-%m-%d").to_string()
}

/// Create the period row if missing and apply the configured limit.
///
/// The limit is never lowered below the current count.
fn ensure_period(
    conn: &Connection,
    key: &str,
    limit: u32,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO quota_ledger (period, count, limit_value, updated_at) VALUES (?1, 0, ?2, ?3) \
         ON CONFLICT(period) DO UPDATE SET limit_value = MAX(excluded.limit_value, count)",
        params![key, limit, format_timestamp(now)],
    )?;
    Ok(())
}

/// Reserve one send slot in `period`. Returns `false` once the limit is reached.
pub async fn try_claim(
    db: &Database,
    period: NaiveDate,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<bool, CampaignerError> {
    let key = period_key(period);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            ensure_period(&tx, &key, limit, now)?;
            let changed = tx.execute(
                "UPDATE quota_ledger SET count = count + 1, updated_at = ?2 \
                 WHERE period = ?1 AND count < limit_value",
                params![key, format_timestamp(now)],
            )?;
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Current usage of `period`. Reading does not create the row.
pub async fn usage(
    db: &Database,
    period: NaiveDate,
    limit: u32,
) -> Result<QuotaUsage, CampaignerError> {
    let key = period_key(period);
    let count = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT count FROM quota_ledger WHERE period = ?1",
                params![key],
                |row| row.get::<_, u32>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .unwrap_or(0);

    // Same effective limit the next claim would write to the row.
    Ok(QuotaUsage {
        period,
        count,
        limit: limit.max(count),
    })
}

/// Slots left in `period`. A hint for batch sizing, not a reservation.
pub async fn remaining(db: &Database, period: NaiveDate, limit: u32) -> Result<u32, CampaignerError> {
    Ok(usage(db, period, limit).await?.remaining())
}
