// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch testing.
//!
//! `TestHarness` assembles a temp SQLite database, a [`MockDeliveryClient`],
//! and a [`Dispatcher`] configured from overridable defaults, plus helpers to
//! seed campaigns and inspect the results.

use std::sync::Arc;

use campaigner_config::model::{CampaignerConfig, StorageConfig};
use campaigner_core::{Campaign, CampaignerError, NewCampaign, QuotaUsage, Recipient};
use campaigner_dispatch::Dispatcher;
use campaigner_storage::queries::{campaigns, recipients};
use campaigner_storage::{Database, NewRecipient};
use chrono::{DateTime, TimeZone, Utc};

use crate::mock_delivery::MockDeliveryClient;

/// Fixed reference instant used by harness helpers (a Monday morning, UTC).
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: CampaignerConfig,
    delivery: Option<Arc<MockDeliveryClient>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: CampaignerConfig::default(),
            delivery: None,
        }
    }

    /// Set the daily quota.
    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.config.quota.daily_limit = limit;
        self
    }

    /// Set the total attempt budget per recipient.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.dispatch.max_attempts = attempts;
        self
    }

    pub fn with_max_batch_size(mut self, size: u32) -> Self {
        self.config.dispatch.max_batch_size = size;
        self
    }

    pub fn with_campaigns_per_tick(mut self, n: u32) -> Self {
        self.config.dispatch.campaigns_per_tick = n;
        self
    }

    pub fn with_worker_concurrency(mut self, n: usize) -> Self {
        self.config.dispatch.worker_concurrency = n;
        self
    }

    /// Use a preconfigured mock delivery client.
    pub fn with_delivery(mut self, client: MockDeliveryClient) -> Self {
        self.delivery = Some(Arc::new(client));
        self
    }

    /// Arbitrary config tweaks.
    pub fn configure(mut self, f: impl FnOnce(&mut CampaignerConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CampaignerError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CampaignerError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path_str.clone(),
            wal_mode: true,
        };

        let db = Database::open(&db_path_str).await?;
        let delivery = self
            .delivery
            .unwrap_or_else(|| Arc::new(MockDeliveryClient::new()));
        let dispatcher = Dispatcher::new(db.clone(), delivery.clone(), &config)?;

        Ok(TestHarness {
            db,
            dispatcher,
            delivery,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock delivery client and temp storage.
pub struct TestHarness {
    /// Database handle (temp file, cleaned up on drop).
    pub db: Database,
    /// Dispatcher wired to `db` and `delivery`.
    pub dispatcher: Dispatcher,
    /// The mock delivery client.
    pub delivery: Arc<MockDeliveryClient>,
    /// Effective configuration.
    pub config: CampaignerConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Create a draft campaign with the given recipients (no scheduling).
    pub async fn draft_campaign(&self, addresses: &[&str]) -> Result<Campaign, CampaignerError> {
        let campaign = campaigns::create_campaign(
            &self.db,
            NewCampaign {
                name: "test campaign".into(),
                subject: "Hello {name}".into(),
                html_body: "<p>Hi {name}, this is for {email}.</p>".into(),
                ..Default::default()
            },
            t0(),
        )
        .await?;
        if !addresses.is_empty() {
            let new = addresses.iter().map(|a| NewRecipient::new(*a)).collect();
            recipients::add_recipients(&self.db, &campaign.id, new, t0()).await?;
        }
        self.campaign(&campaign.id).await
    }

    /// Create a campaign with the given recipients, scheduled for `at`.
    pub async fn scheduled_campaign(
        &self,
        addresses: &[&str],
        at: DateTime<Utc>,
    ) -> Result<Campaign, CampaignerError> {
        let draft = self.draft_campaign(addresses).await?;
        campaigns::schedule_campaign(&self.db, &draft.id, at, t0()).await
    }

    /// Reload a campaign; missing campaigns are an error.
    pub async fn campaign(&self, id: &str) -> Result<Campaign, CampaignerError> {
        campaigns::get_campaign(&self.db, id)
            .await?
            .ok_or_else(|| CampaignerError::not_found("campaign", id))
    }

    /// All recipients of a campaign in insertion order.
    pub async fn recipients(&self, campaign_id: &str) -> Result<Vec<Recipient>, CampaignerError> {
        recipients::list_recipients(&self.db, campaign_id).await
    }

    /// Quota usage for the UTC day containing `now`.
    pub async fn quota_usage(&self, now: DateTime<Utc>) -> Result<QuotaUsage, CampaignerError> {
        self.dispatcher
            .ledger()
            .usage(campaigner_core::quota_period(now))
            .await
    }
}
