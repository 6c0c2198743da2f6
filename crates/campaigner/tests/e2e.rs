// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete campaign pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite and a mock
//! delivery client. Tests are independent and order-insensitive.

use campaigner_core::{
    CampaignStatus, DeliveryEventKind, NewCampaign, RecipientStatus, SuppressionReason,
};
use campaigner_storage::NewRecipient;
use campaigner_storage::queries::{campaigns, recipients};
use campaigner_test_utils::harness::t0;
use campaigner_test_utils::{MockDeliveryClient, TestHarness};
use chrono::TimeDelta;

// ---- Lifecycle: create, populate, schedule, dispatch ----

#[tokio::test]
async fn campaign_lifecycle_from_draft_to_sent() {
    let h = TestHarness::builder().build().await.unwrap();

    let draft = campaigns::create_campaign(
        &h.db,
        NewCampaign {
            name: "spring launch".into(),
            subject: "Hi {name}".into(),
            html_body: "<html><body><p>Hello {name}</p></body></html>".into(),
            from_address: Some("news@shop.example".into()),
            target_tag: None,
        },
        t0(),
    )
    .await
    .unwrap();
    assert_eq!(draft.status, CampaignStatus::Draft);

    let added = recipients::add_recipients(
        &h.db,
        &draft.id,
        vec![
            NewRecipient::new("Ann@X.com").with_name("Ann"),
            NewRecipient::new("ann@x.com"),
            NewRecipient::new("bob@x.com"),
        ],
        t0(),
    )
    .await
    .unwrap();
    assert_eq!(added, 2, "normalized duplicate skipped");

    campaigns::update_content(&h.db, &draft.id, Some("Hello {name}".into()), None, t0())
        .await
        .unwrap();
    campaigns::schedule_campaign(&h.db, &draft.id, t0() + TimeDelta::hours(1), t0())
        .await
        .unwrap();

    // Not yet due.
    let early = h.dispatcher.tick_at(t0()).await.unwrap();
    assert_eq!(early.campaigns_processed, 0);

    let report = h.dispatcher.tick_at(t0() + TimeDelta::hours(1)).await.unwrap();
    assert_eq!(report.sent, 2);
    assert_eq!(report.campaigns_completed, vec![draft.id.clone()]);

    let messages = h.delivery.sent_messages().await;
    let ann = messages.iter().find(|m| m.to == "ann@x.com").unwrap();
    assert_eq!(ann.subject, "Hello Ann");
    assert_eq!(ann.from, "news@shop.example");
    assert!(ann.html_body.contains("Hello Ann"));

    // Sent campaigns are frozen.
    let err = campaigns::update_content(&h.db, &draft.id, Some("late".into()), None, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, campaigner_core::CampaignerError::Immutable { .. }));
    assert!(campaigns::delete_campaign(&h.db, &draft.id).await.is_err());

    let stats = campaigns::campaign_stats(&h.db, &draft.id).await.unwrap();
    assert_eq!(stats.count(RecipientStatus::Sent), 2);
    assert_eq!(stats.outstanding(), 0);
}

// ---- Delivery events feed the suppression list ----

#[tokio::test]
async fn bounce_event_suppresses_address_for_later_campaigns() {
    let h = TestHarness::builder().build().await.unwrap();
    let first = h
        .scheduled_campaign(&["a@x.com", "b@x.com"], t0())
        .await
        .unwrap();
    h.dispatcher.tick_at(t0()).await.unwrap();

    let a = h
        .recipients(&first.id)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.address == "a@x.com")
        .unwrap();
    let message_id = a.provider_message_id.clone().unwrap();

    let updated = recipients::record_delivery_event(
        &h.db,
        &message_id,
        DeliveryEventKind::Bounced,
        t0() + TimeDelta::minutes(5),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.status, RecipientStatus::Bounced);
    assert_eq!(
        h.dispatcher
            .suppressions()
            .is_suppressed("a@x.com")
            .await
            .unwrap(),
        Some(SuppressionReason::Bounce)
    );

    let second = h
        .scheduled_campaign(&["a@x.com", "c@x.com"], t0() + TimeDelta::hours(1))
        .await
        .unwrap();
    let report = h
        .dispatcher
        .tick_at(t0() + TimeDelta::hours(1))
        .await
        .unwrap();
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.sent, 1);

    let a2 = h
        .recipients(&second.id)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.address == "a@x.com")
        .unwrap();
    assert_eq!(a2.status, RecipientStatus::Bounced);
    assert_eq!(h.delivery.sent_to().await.iter().filter(|a| *a == "a@x.com").count(), 1);
}

#[tokio::test]
async fn unknown_message_id_event_is_ignored() {
    let h = TestHarness::builder().build().await.unwrap();
    let updated =
        recipients::record_delivery_event(&h.db, "nope", DeliveryEventKind::Delivered, t0())
            .await
            .unwrap();
    assert!(updated.is_none());
}

// ---- Quota is shared across campaigns ----

#[tokio::test]
async fn daily_quota_is_shared_across_campaigns() {
    let h = TestHarness::builder().with_daily_limit(3).build().await.unwrap();
    let first = h
        .scheduled_campaign(&["a@x.com", "b@x.com"], t0() - TimeDelta::hours(2))
        .await
        .unwrap();
    let second = h
        .scheduled_campaign(&["c@x.com", "d@x.com"], t0() - TimeDelta::hours(1))
        .await
        .unwrap();

    let report = h.dispatcher.tick_at(t0()).await.unwrap();
    assert_eq!(report.sent, 3);
    assert!(report.quota_exhausted);
    assert_eq!(report.campaigns_completed, vec![first.id.clone()]);
    assert_eq!(h.quota_usage(t0()).await.unwrap().count, 3);

    let second_state = h.campaign(&second.id).await.unwrap();
    assert_eq!(second_state.status, CampaignStatus::Sending);
    assert_eq!(second_state.sent_count, 1);
}

// ---- Failures are isolated per recipient ----

#[tokio::test]
async fn always_failing_provider_marks_every_recipient_failed() {
    let h = TestHarness::builder()
        .with_delivery(MockDeliveryClient::always_failing(502))
        .with_max_attempts(1)
        .build()
        .await
        .unwrap();
    let c = h
        .scheduled_campaign(&["a@x.com", "b@x.com"], t0())
        .await
        .unwrap();

    let report = h.dispatcher.tick_at(t0()).await.unwrap();
    assert_eq!(report.failed, 2);

    let campaign = h.campaign(&c.id).await.unwrap();
    assert_eq!(campaign.status, CampaignStatus::Sent);
    assert_eq!(campaign.failed_count, 2);
    for r in h.recipients(&c.id).await.unwrap() {
        assert_eq!(r.status, RecipientStatus::Failed);
        assert!(r.last_error.unwrap().contains("502"));
    }
}
