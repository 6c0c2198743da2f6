// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient queue with lease-based exclusive claims.

use std::time::Duration;

use campaigner_core::CampaignerError;
use campaigner_storage::queries::recipients;
use campaigner_storage::{ClaimedBatch, Database, RecipientOutcome};
use chrono::{DateTime, TimeDelta, Utc};

/// Claims and outcome writes for campaign recipients.
///
/// A claim older than `lease` is treated as abandoned: its recipients become
/// claimable again, and any stuck in `sending` are reset by [`recover_stale`].
///
/// [`recover_stale`]: RecipientQueue::recover_stale
#[derive(Clone)]
pub struct RecipientQueue {
    db: Database,
    lease: TimeDelta,
}

impl RecipientQueue {
    pub fn new(db: Database, lease: Duration) -> Result<Self, CampaignerError> {
        let lease = TimeDelta::from_std(lease)
            .map_err(|e| CampaignerError::Config(format!("claim lease out of range: {e}")))?;
        Ok(Self { db, lease })
    }

    fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lease
    }

    pub async fn claim_batch(
        &self,
        campaign_id: &str,
        max_count: u32,
        now: DateTime<Utc>,
    ) -> Result<ClaimedBatch, CampaignerError> {
        recipients::claim_batch(&self.db, campaign_id, max_count, now, self.stale_before(now)).await
    }

    pub async fn mark_sending(
        &self,
        batch: &ClaimedBatch,
        now: DateTime<Utc>,
    ) -> Result<usize, CampaignerError> {
        recipients::mark_sending(&self.db, batch, now).await
    }

    pub async fn mark_outcome(
        &self,
        recipient_id: i64,
        claim_token: &str,
        outcome: RecipientOutcome,
        now: DateTime<Utc>,
    ) -> Result<bool, CampaignerError> {
        recipients::mark_outcome(&self.db, recipient_id, claim_token, outcome, now).await
    }

    /// Defer the campaign's unclaimed eligible recipients until `until`.
    pub async fn defer_unclaimed(
        &self,
        campaign_id: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<usize, CampaignerError> {
        recipients::defer_unclaimed(&self.db, campaign_id, until, now, self.stale_before(now)).await
    }

    /// Reset recipients left in `sending` by a crashed or timed-out tick.
    pub async fn recover_stale(&self, now: DateTime<Utc>) -> Result<usize, CampaignerError> {
        recipients::recover_stale_sending(&self.db, self.stale_before(now), now).await
    }
}
