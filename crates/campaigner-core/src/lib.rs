// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Campaigner dispatch engine.
//!
//! This crate provides the error type, the campaign/recipient domain model,
//! and the adapter traits that delivery providers implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CampaignerError;
pub use types::{
    Campaign, CampaignStatus, DeliveryEventKind, DeliveryReceipt, HealthStatus, NewCampaign,
    OutboundEmail, QuotaUsage, Recipient, RecipientStatus, SuppressionEntry, SuppressionReason,
    IDEMPOTENCY_KEY_ARG, format_timestamp, normalize_address, parse_timestamp, quota_period,
};

pub use traits::DeliveryAdapter;
