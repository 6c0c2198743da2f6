// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side model types and row mappers.
//!
//! The canonical domain types live in `campaigner-core::types`; this module
//! adds the shapes that only exist at the persistence boundary.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub use campaigner_core::types::{
    Campaign, CampaignStatus, NewCampaign, QuotaUsage, Recipient, RecipientStatus,
    SuppressionEntry, SuppressionReason,
};

/// A recipient to add to a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipient {
    pub address: String,
    pub name: Option<String>,
}

impl NewRecipient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Recipients claimed together under one token.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedBatch {
    pub claim_token: String,
    pub recipients: Vec<Recipient>,
}

impl ClaimedBatch {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }
}

/// Final write for one claimed recipient.
///
/// Every variant releases the claim. Only `Sent`, `Retry`, and `Failed`
/// count as delivery attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientOutcome {
    /// Provider accepted the message.
    Sent { provider_message_id: String },
    /// Address was on the suppression list; nothing was sent.
    Suppressed { status: RecipientStatus },
    /// Provider call failed and the recipient has attempts left.
    Retry {
        error: String,
        retry_at: DateTime<Utc>,
    },
    /// Provider call failed and the attempt budget is exhausted.
    Failed { error: String },
    /// No quota slot was available; back to pending without using an attempt.
    Deferred { until: DateTime<Utc> },
}

impl RecipientOutcome {
    /// Status the recipient row ends up in.
    pub fn status(&self) -> RecipientStatus {
        match self {
            RecipientOutcome::Sent { .. } => RecipientStatus::Sent,
            RecipientOutcome::Suppressed { status } => *status,
            RecipientOutcome::Retry { .. } | RecipientOutcome::Deferred { .. } => {
                RecipientStatus::Pending
            }
            RecipientOutcome::Failed { .. } => RecipientStatus::Failed,
        }
    }

    pub fn counts_as_attempt(&self) -> bool {
        matches!(
            self,
            RecipientOutcome::Sent { .. }
                | RecipientOutcome::Retry { .. }
                | RecipientOutcome::Failed { .. }
        )
    }
}

/// Campaign plus a per-status breakdown of its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignStats {
    pub campaign: Campaign,
    pub by_status: BTreeMap<String, i64>,
}

impl CampaignStats {
    pub fn count(&self, status: RecipientStatus) -> i64 {
        self.by_status
            .get(&status.to_string())
            .copied()
            .unwrap_or(0)
    }

    /// Recipients still waiting for a send (pending or in flight).
    pub fn outstanding(&self) -> i64 {
        self.count(RecipientStatus::Pending) + self.count(RecipientStatus::Sending)
    }
}

pub(crate) const CAMPAIGN_COLUMNS: &str = "id, name, subject, html_body, from_address, target_tag, \
     status, scheduled_at, sent_at, completed_at, recipient_count, sent_count, failed_count, \
     created_at, updated_at";

pub(crate) const RECIPIENT_COLUMNS: &str = "id, campaign_id, address, name, status, attempt_count, \
     last_error, scheduled_for, provider_message_id, claim_token, claimed_at, updated_at";

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    campaigner_core::parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| campaigner_core::parse_timestamp(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Map a row selected with [`CAMPAIGN_COLUMNS`].
pub(crate) fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        subject: row.get(2)?,
        html_body: row.get(3)?,
        from_address: row.get(4)?,
        target_tag: row.get(5)?,
        status: get_enum(row, 6)?,
        scheduled_at: get_opt_ts(row, 7)?,
        sent_at: get_opt_ts(row, 8)?,
        completed_at: get_opt_ts(row, 9)?,
        recipient_count: row.get(10)?,
        sent_count: row.get(11)?,
        failed_count: row.get(12)?,
        created_at: get_ts(row, 13)?,
        updated_at: get_ts(row, 14)?,
    })
}

/// Map a row selected with [`RECIPIENT_COLUMNS`].
pub(crate) fn recipient_from_row(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        address: row.get(2)?,
        name: row.get(3)?,
        status: get_enum(row, 4)?,
        attempt_count: row.get(5)?,
        last_error: row.get(6)?,
        scheduled_for: get_opt_ts(row, 7)?,
        provider_message_id: row.get(8)?,
        claim_token: row.get(9)?,
        claimed_at: get_opt_ts(row, 10)?,
        updated_at: get_ts(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn outcome_statuses_and_attempt_accounting() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let sent = RecipientOutcome::Sent {
            provider_message_id: "m-1".into(),
        };
        let deferred = RecipientOutcome::Deferred { until: at };
        let retry = RecipientOutcome::Retry {
            error: "503".into(),
            retry_at: at,
        };
        let suppressed = RecipientOutcome::Suppressed {
            status: RecipientStatus::Unsubscribed,
        };

        assert_eq!(sent.status(), RecipientStatus::Sent);
        assert_eq!(deferred.status(), RecipientStatus::Pending);
        assert_eq!(retry.status(), RecipientStatus::Pending);
        assert_eq!(suppressed.status(), RecipientStatus::Unsubscribed);

        assert!(sent.counts_as_attempt());
        assert!(retry.counts_as_attempt());
        assert!(!deferred.counts_as_attempt());
        assert!(!suppressed.counts_as_attempt());
    }
}
