// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, delivery, and dispatch.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Aggregate lifecycle of a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Cancelled,
}

impl CampaignStatus {
    /// Content and recipients may only change before dispatch begins.
    pub fn is_editable(self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Scheduled)
    }
}

/// Per-recipient send lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sending,
    Sent,
    Delivered,
    Bounced,
    Unsubscribed,
    Complained,
    Failed,
}

/// Why an address is on the suppression list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    Unsubscribe,
    Bounce,
    Complaint,
}

impl SuppressionReason {
    /// Terminal recipient status written when a suppressed address is skipped.
    pub fn recipient_status(self) -> RecipientStatus {
        match self {
            SuppressionReason::Unsubscribe => RecipientStatus::Unsubscribed,
            SuppressionReason::Bounce | SuppressionReason::Complaint => RecipientStatus::Bounced,
        }
    }
}

/// A bulk-send job with one content payload and many recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub html_body: String,
    /// Sender address; falls back to the configured default when `None`.
    pub from_address: Option<String>,
    /// Audience targeting tag used by the external audience selector.
    pub target_tag: Option<String>,
    pub status: CampaignStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// First time the dispatcher touched the campaign.
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub recipient_count: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a campaign in `draft`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub subject: String,
    pub html_body: String,
    pub from_address: Option<String>,
    pub target_tag: Option<String>,
}

/// One addressee's send lifecycle within a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub campaign_id: String,
    pub address: String,
    pub name: Option<String>,
    pub status: RecipientStatus,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    /// Deferral: not eligible for claiming before this instant.
    pub scheduled_for: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub claim_token: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// An address that must never receive messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub address: String,
    pub reason: SuppressionReason,
    pub recorded_at: DateTime<Utc>,
}

/// Snapshot of one quota period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub period: NaiveDate,
    pub count: u32,
    pub limit: u32,
}

impl QuotaUsage {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

/// A fully rendered message handed to the delivery client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
    /// Opaque key/value pairs echoed back by the provider in webhooks.
    pub custom_args: BTreeMap<String, String>,
}

/// `custom_args` key carrying the per-attempt idempotency key
/// (`{campaign_id}-{recipient_id}-{attempt}`).
pub const IDEMPOTENCY_KEY_ARG: &str = "idempotency_key";

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub provider_message_id: String,
}

/// Provider webhook events that update a recipient after sending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEventKind {
    Delivered,
    Bounced,
    Complained,
}

impl DeliveryEventKind {
    pub fn recipient_status(self) -> RecipientStatus {
        match self {
            DeliveryEventKind::Delivered => RecipientStatus::Delivered,
            DeliveryEventKind::Bounced => RecipientStatus::Bounced,
            DeliveryEventKind::Complained => RecipientStatus::Complained,
        }
    }

    /// Events that put the address on the suppression list.
    pub fn suppression_reason(self) -> Option<SuppressionReason> {
        match self {
            DeliveryEventKind::Delivered => None,
            DeliveryEventKind::Bounced => Some(SuppressionReason::Bounce),
            DeliveryEventKind::Complained => Some(SuppressionReason::Complaint),
        }
    }
}

/// Lowercase and trim an address so suppression lookups are case-insensitive.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Quota period key for an instant (UTC calendar day).
pub fn quota_period(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Render a timestamp in the fixed-width form stored in SQLite.
///
/// Millisecond precision with a `Z` suffix keeps lexicographic order equal to
/// chronological order, which the claim and due-campaign queries rely on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp written by [`format_timestamp`] (or any RFC 3339 string).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
