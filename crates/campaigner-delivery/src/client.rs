// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter decorator that applies the provider rate limits.

use std::sync::Arc;

use async_trait::async_trait;
use campaigner_config::model::RateLimitConfig;
use campaigner_core::{CampaignerError, DeliveryAdapter, DeliveryReceipt, OutboundEmail};
use tracing::{debug, warn};

use crate::rate_limiter::RateLimiter;

/// Wraps an inner delivery adapter so every `send` first passes the
/// [`RateLimiter`]. The permit is held until the inner call returns, so the
/// concurrency cap counts calls actually in flight.
pub struct RateLimitedClient {
    inner: Arc<dyn DeliveryAdapter>,
    limiter: RateLimiter,
    name: String,
}

impl RateLimitedClient {
    pub fn new(inner: Arc<dyn DeliveryAdapter>, config: &RateLimitConfig) -> Self {
        Self::with_limiter(inner, RateLimiter::new(config))
    }

    pub fn with_limiter(inner: Arc<dyn DeliveryAdapter>, limiter: RateLimiter) -> Self {
        let name = format!("rate-limited({})", inner.name());
        Self {
            inner,
            limiter,
            name,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[async_trait]
impl DeliveryAdapter for RateLimitedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: OutboundEmail) -> Result<DeliveryReceipt, CampaignerError> {
        let _permit = self.limiter.acquire().await?;
        let to = message.to.clone();
        match self.inner.send(message).await {
            Ok(receipt) => {
                debug!(to = %to, provider_message_id = %receipt.provider_message_id, "message accepted");
                Ok(receipt)
            }
            Err(e) => {
                warn!(to = %to, code = ?e.provider_code(), error = %e, "provider rejected message");
                Err(e)
            }
        }
    }
}
