// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP delivery client for a JSON mail-send API.
//!
//! One POST per message with bearer authentication. The provider's message id
//! is taken from the `x-message-id` response header, falling back to a
//! `message_id` field in the JSON body.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use campaigner_config::model::ProviderConfig;
use campaigner_core::{
    CampaignerError, DeliveryAdapter, DeliveryReceipt, IDEMPOTENCY_KEY_ARG, OutboundEmail,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html: &'a str,
    custom_args: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    message_id: Option<String>,
}

/// Delivery adapter backed by the provider's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDeliveryClient {
    /// Build a client from `[provider]` settings. An API key is required.
    pub fn new(config: &ProviderConfig) -> Result<Self, CampaignerError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            CampaignerError::Config(
                "provider.api_key is not set (or CAMPAIGNER_PROVIDER_API_KEY)".into(),
            )
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| CampaignerError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CampaignerError::Provider {
                code: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryAdapter for HttpDeliveryClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: OutboundEmail) -> Result<DeliveryReceipt, CampaignerError> {
        let body = SendRequest {
            to: &message.to,
            from: &message.from,
            subject: &message.subject,
            html: &message.html_body,
            custom_args: &message.custom_args,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = message.custom_args.get(IDEMPOTENCY_KEY_ARG) {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await.map_err(|e| CampaignerError::Provider {
            code: None,
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status();
        debug!(status = %status, to = %message.to, "provider response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CampaignerError::Provider {
                code: Some(status.as_u16()),
                message: format!("provider returned {status}: {body}"),
            });
        }

        let header_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(provider_message_id) = header_id {
            return Ok(DeliveryReceipt {
                provider_message_id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<SendResponse>(&body)
            .ok()
            .and_then(|r| r.message_id)
            .map(|provider_message_id| DeliveryReceipt {
                provider_message_id,
            })
            .ok_or_else(|| CampaignerError::Provider {
                code: Some(status.as_u16()),
                message: "provider accepted the message without a message id".into(),
            })
    }
}
