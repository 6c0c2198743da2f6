// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily quota ledger with claim-before-send semantics.
//!
//! A slot is reserved before the provider call. A crash between the claim and
//! the send loses that slot; it never lets the day overshoot its limit.

use campaigner_core::{CampaignerError, QuotaUsage};
use campaigner_storage::Database;
use campaigner_storage::queries::quota;
use chrono::{NaiveDate, Utc};
use tracing::warn;

/// Usage fraction at which [`QuotaLedger::usage`] logs a warning.
const WARN_THRESHOLD: f64 = 0.8;

/// Persistent per-day send counter.
#[derive(Clone)]
pub struct QuotaLedger {
    db: Database,
    daily_limit: u32,
}

impl QuotaLedger {
    pub fn new(db: Database, daily_limit: u32) -> Self {
        Self { db, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Atomically reserve one slot in `period`. `false` means the limit is reached.
    pub async fn try_claim(&self, period: NaiveDate) -> Result<bool, CampaignerError> {
        quota::try_claim(&self.db, period, self.daily_limit, Utc::now()).await
    }

    /// Non-authoritative count of slots left, used to size batch claims.
    pub async fn remaining(&self, period: NaiveDate) -> Result<u32, CampaignerError> {
        quota::remaining(&self.db, period, self.daily_limit).await
    }

    pub async fn usage(&self, period: NaiveDate) -> Result<QuotaUsage, CampaignerError> {
        let usage = quota::usage(&self.db, period, self.daily_limit).await?;
        if usage.limit > 0 && f64::from(usage.count) >= f64::from(usage.limit) * WARN_THRESHOLD {
            warn!(
                period = %usage.period,
                count = usage.count,
                limit = usage.limit,
                "daily quota above 80%"
            );
        }
        Ok(usage)
    }
}
