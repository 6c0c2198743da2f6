// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The batch processor invoked once per tick.
//!
//! Per tick:
//!
//! 1. Reset recipients abandoned in `sending` by an earlier tick.
//! 2. Stop if today's quota is already spent.
//! 3. Take up to `campaigns_per_tick` due campaigns, oldest send time first.
//! 4. For each: first touch moves it to `sending`; claim a batch sized by the
//!    remaining quota; process recipients with bounded concurrency.
//! 5. Run completion detection for each campaign touched.
//!
//! Per-recipient errors never abort the tick. Losing the quota race halts only
//! the current campaign's batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use campaigner_config::model::{CampaignerConfig, DispatchConfig};
use campaigner_core::{
    Campaign, CampaignStatus, CampaignerError, DeliveryAdapter, Recipient, quota_period,
};
use campaigner_storage::queries::campaigns;
use campaigner_storage::{Database, RecipientOutcome};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::ledger::QuotaLedger;
use crate::personalize::Personalizer;
use crate::queue::RecipientQueue;
use crate::report::{RecipientResult, TickReport};
use crate::suppression::SuppressionRegistry;

fn delta(d: std::time::Duration, what: &str) -> Result<TimeDelta, CampaignerError> {
    TimeDelta::from_std(d)
        .map_err(|e| CampaignerError::Config(format!("dispatch.{what} out of range: {e}")))
}

/// Everything one campaign pass needs about the current tick.
struct Pass<'a> {
    campaign: &'a Campaign,
    claim_token: &'a str,
    period: NaiveDate,
    now: DateTime<Utc>,
    halted: &'a AtomicBool,
}

/// Quota-bounded batch dispatcher.
///
/// All collaborators are injected; the dispatcher owns no global state.
pub struct Dispatcher {
    db: Database,
    ledger: QuotaLedger,
    suppressions: SuppressionRegistry,
    queue: RecipientQueue,
    client: Arc<dyn DeliveryAdapter>,
    personalizer: Personalizer,
    config: DispatchConfig,
    retry_deferral: TimeDelta,
    quota_deferral: TimeDelta,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        client: Arc<dyn DeliveryAdapter>,
        config: &CampaignerConfig,
    ) -> Result<Self, CampaignerError> {
        let dispatch = config.dispatch.clone();
        Ok(Self {
            ledger: QuotaLedger::new(db.clone(), config.quota.daily_limit),
            suppressions: SuppressionRegistry::new(db.clone()),
            queue: RecipientQueue::new(db.clone(), dispatch.claim_lease())?,
            personalizer: Personalizer::new(&config.content)?,
            retry_deferral: delta(dispatch.retry_deferral(), "retry_deferral_secs")?,
            quota_deferral: delta(dispatch.quota_deferral(), "quota_deferral_secs")?,
            config: dispatch,
            client,
            db,
        })
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    pub fn suppressions(&self) -> &SuppressionRegistry {
        &self.suppressions
    }

    pub fn queue(&self) -> &RecipientQueue {
        &self.queue
    }

    /// Run one tick at the current time.
    pub async fn tick(&self) -> Result<TickReport, CampaignerError> {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick as if the clock read `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport, CampaignerError> {
        let started = tokio::time::Instant::now();
        let mut report = TickReport {
            recovered: self.queue.recover_stale(now).await?,
            ..Default::default()
        };

        let period = quota_period(now);
        if self.ledger.remaining(period).await? == 0 {
            info!(period = %period, "daily quota exhausted, skipping tick");
            report.quota_exhausted = true;
            return Ok(report);
        }

        let due = campaigns::due_campaigns(&self.db, now, self.config.campaigns_per_tick).await?;
        debug!(due = due.len(), client = self.client.name(), "tick started");

        for campaign in &due {
            if started.elapsed() >= self.config.tick_budget() {
                info!(
                    budget_secs = self.config.tick_budget_secs,
                    "tick budget elapsed, deferring remaining campaigns"
                );
                report.budget_exhausted = true;
                break;
            }
            report.campaigns_processed += 1;
            if let Err(e) = self.process_campaign(campaign, period, now, &mut report).await {
                error!(campaign_id = %campaign.id, error = %e, "campaign pass failed");
            }
        }

        info!(
            campaigns = report.campaigns_processed,
            sent = report.sent,
            suppressed = report.suppressed,
            retried = report.retried,
            failed = report.failed,
            deferred = report.deferred,
            completed = report.campaigns_completed.len(),
            "tick finished"
        );
        Ok(report)
    }

    /// Schedule a campaign for `now` and run one tick immediately.
    pub async fn send_now(&self, campaign_id: &str) -> Result<TickReport, CampaignerError> {
        self.send_now_at(campaign_id, Utc::now()).await
    }

    pub async fn send_now_at(
        &self,
        campaign_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TickReport, CampaignerError> {
        campaigns::schedule_campaign(&self.db, campaign_id, now, now).await?;
        self.tick_at(now).await
    }

    async fn process_campaign(
        &self,
        campaign: &Campaign,
        period: NaiveDate,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<(), CampaignerError> {
        if campaign.status == CampaignStatus::Scheduled {
            if campaigns::begin_sending(&self.db, &campaign.id, now).await? {
                info!(campaign_id = %campaign.id, name = %campaign.name, "campaign sending");
            } else {
                // Cancelled (or rescheduled) after it was selected as due.
                let current = campaigns::get_campaign(&self.db, &campaign.id).await?;
                if current.map(|c| c.status) != Some(CampaignStatus::Sending) {
                    debug!(campaign_id = %campaign.id, "campaign no longer dispatchable");
                    return Ok(());
                }
            }
        }

        let remaining = self.ledger.remaining(period).await?;
        let max_count = remaining.min(self.config.max_batch_size);
        let batch = self.queue.claim_batch(&campaign.id, max_count, now).await?;

        if !batch.is_empty() {
            self.queue.mark_sending(&batch, now).await?;
            debug!(campaign_id = %campaign.id, claimed = batch.len(), "batch claimed");

            let halted = AtomicBool::new(false);
            let pass = Pass {
                campaign,
                claim_token: &batch.claim_token,
                period,
                now,
                halted: &halted,
            };
            let results: Vec<RecipientResult> = futures::stream::iter(&batch.recipients)
                .map(|recipient| self.process_recipient(&pass, recipient))
                .buffer_unordered(self.config.worker_concurrency.max(1))
                .collect()
                .await;
            for result in results {
                report.record(result);
            }
        }

        // Once the day's quota is spent, the rest of the audience waits for the
        // quota deferral rather than being re-polled every tick.
        if self.ledger.remaining(period).await? == 0 {
            report.quota_exhausted = true;
            let until = now + self.quota_deferral;
            let deferred = self.queue.defer_unclaimed(&campaign.id, until, now).await?;
            report.deferred += deferred;
            if deferred > 0 {
                info!(
                    campaign_id = %campaign.id,
                    deferred,
                    until = %until,
                    "daily quota exhausted, deferring unclaimed recipients"
                );
            }
        }

        if campaigns::complete_if_drained(&self.db, &campaign.id, now).await? {
            info!(campaign_id = %campaign.id, "campaign sent");
            report.campaigns_completed.push(campaign.id.clone());
        }
        Ok(())
    }

    async fn process_recipient(&self, pass: &Pass<'_>, recipient: &Recipient) -> RecipientResult {
        match self.try_process_recipient(pass, recipient).await {
            Ok(result) => result,
            Err(e) => {
                // The recipient stays `sending`; lease recovery returns it to the queue.
                error!(
                    campaign_id = %pass.campaign.id,
                    recipient_id = recipient.id,
                    error = %e,
                    "recipient processing failed"
                );
                RecipientResult::Abandoned
            }
        }
    }

    async fn try_process_recipient(
        &self,
        pass: &Pass<'_>,
        recipient: &Recipient,
    ) -> Result<RecipientResult, CampaignerError> {
        if pass.halted.load(Ordering::SeqCst) {
            return self.defer_for_quota(pass, recipient).await;
        }

        if let Some(reason) = self.suppressions.is_suppressed(&recipient.address).await? {
            let status = reason.recipient_status();
            debug!(recipient_id = recipient.id, reason = %reason, "recipient suppressed");
            let outcome = RecipientOutcome::Suppressed { status };
            return self
                .write(pass, recipient, outcome, RecipientResult::Suppressed)
                .await;
        }

        if !self.ledger.try_claim(pass.period).await? {
            if !pass.halted.swap(true, Ordering::SeqCst) {
                info!(
                    campaign_id = %pass.campaign.id,
                    "daily quota exhausted mid-batch, halting campaign"
                );
            }
            return self.defer_for_quota(pass, recipient).await;
        }

        let message = self.personalizer.render(pass.campaign, recipient);
        let attempt = recipient.attempt_count + 1;
        match self.client.send(message).await {
            Ok(receipt) => {
                let outcome = RecipientOutcome::Sent {
                    provider_message_id: receipt.provider_message_id,
                };
                self.write(pass, recipient, outcome, RecipientResult::Sent).await
            }
            Err(e) if attempt < self.config.max_attempts => {
                warn!(
                    campaign_id = %pass.campaign.id,
                    recipient_id = recipient.id,
                    attempt,
                    code = ?e.provider_code(),
                    error = %e,
                    "delivery failed, will retry"
                );
                let outcome = RecipientOutcome::Retry {
                    error: e.to_string(),
                    retry_at: pass.now + self.retry_deferral,
                };
                self.write(pass, recipient, outcome, RecipientResult::Retried).await
            }
            Err(e) => {
                warn!(
                    campaign_id = %pass.campaign.id,
                    recipient_id = recipient.id,
                    attempt,
                    code = ?e.provider_code(),
                    error = %e,
                    "delivery failed, attempts exhausted"
                );
                let outcome = RecipientOutcome::Failed {
                    error: e.to_string(),
                };
                self.write(pass, recipient, outcome, RecipientResult::Failed).await
            }
        }
    }

    async fn defer_for_quota(
        &self,
        pass: &Pass<'_>,
        recipient: &Recipient,
    ) -> Result<RecipientResult, CampaignerError> {
        let outcome = RecipientOutcome::Deferred {
            until: pass.now + self.quota_deferral,
        };
        self.write(pass, recipient, outcome, RecipientResult::Deferred)
            .await
    }

    async fn write(
        &self,
        pass: &Pass<'_>,
        recipient: &Recipient,
        outcome: RecipientOutcome,
        result: RecipientResult,
    ) -> Result<RecipientResult, CampaignerError> {
        let applied = self
            .queue
            .mark_outcome(recipient.id, pass.claim_token, outcome, pass.now)
            .await?;
        if applied {
            Ok(result)
        } else {
            warn!(
                campaign_id = %pass.campaign.id,
                recipient_id = recipient.id,
                "claim lost before outcome write"
            );
            Ok(RecipientResult::Abandoned)
        }
    }
}
