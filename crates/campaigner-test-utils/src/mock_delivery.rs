// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery adapter for deterministic testing.
//!
//! `MockDeliveryClient` implements `DeliveryAdapter` with scripted outcomes
//! and records every message it is handed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use campaigner_core::{CampaignerError, DeliveryAdapter, DeliveryReceipt, OutboundEmail};

/// One scripted provider reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Accept the message with a generated id.
    Accept,
    /// Reject with the given provider status code.
    Reject(u16),
}

/// A mock delivery client.
///
/// Scripted responses are popped from a FIFO queue. Addresses registered with
/// [`fail_address`](Self::fail_address) always fail. Otherwise the default
/// response (accept, unless built with [`always_failing`](Self::always_failing))
/// is used.
pub struct MockDeliveryClient {
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    failing_addresses: Arc<Mutex<HashMap<String, u16>>>,
    default: MockResponse,
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    calls: AtomicUsize,
}

impl MockDeliveryClient {
    /// A client that accepts every message.
    pub fn new() -> Self {
        Self::build(MockResponse::Accept, Vec::new())
    }

    /// A client that rejects every message with `code`.
    pub fn always_failing(code: u16) -> Self {
        Self::build(MockResponse::Reject(code), Vec::new())
    }

    /// A client that plays `script` first, then accepts.
    pub fn with_script(script: Vec<MockResponse>) -> Self {
        Self::build(MockResponse::Accept, script)
    }

    fn build(default: MockResponse, script: Vec<MockResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            failing_addresses: Arc::new(Mutex::new(HashMap::new())),
            default,
            sent: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a response to play before the default.
    pub async fn push_response(&self, response: MockResponse) {
        self.script.lock().await.push_back(response);
    }

    /// Make every send to `address` fail with `code`.
    pub async fn fail_address(&self, address: &str, code: u16) {
        self.failing_addresses
            .lock()
            .await
            .insert(address.to_string(), code);
    }

    /// Number of `send` calls, accepted or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every message handed to `send`, in call order.
    pub async fn sent_messages(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    /// Addresses handed to `send`, in call order.
    pub async fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|m| m.to.clone())
            .collect()
    }
}

impl Default for MockDeliveryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryAdapter for MockDeliveryClient {
    fn name(&self) -> &str {
        "mock-delivery"
    }

    async fn send(&self, message: OutboundEmail) -> Result<DeliveryReceipt, CampaignerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let pinned = self
            .failing_addresses
            .lock()
            .await
            .get(&message.to)
            .copied();
        let response = match pinned {
            Some(code) => MockResponse::Reject(code),
            None => self
                .script
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| self.default.clone()),
        };
        self.sent.lock().await.push(message);

        match response {
            MockResponse::Accept => Ok(DeliveryReceipt {
                provider_message_id: format!("mock-msg-{n}"),
            }),
            MockResponse::Reject(code) => Err(CampaignerError::Provider {
                code: Some(code),
                message: format!("mock provider rejected with {code}"),
            }),
        }
    }
}
