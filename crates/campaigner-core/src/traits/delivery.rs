// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter trait for outbound message providers.

use async_trait::async_trait;

use crate::error::CampaignerError;
use crate::types::{DeliveryReceipt, OutboundEmail};

/// Adapter for handing a rendered message to an external delivery provider.
///
/// Implementations make exactly one provider call per `send` and never retry;
/// retry policy belongs to the dispatcher. Rejections surface as
/// [`CampaignerError::Provider`] carrying the provider status code.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync + 'static {
    /// Human-readable adapter name, used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Sends a single message and returns the provider's receipt.
    async fn send(&self, message: OutboundEmail) -> Result<DeliveryReceipt, CampaignerError>;
}
