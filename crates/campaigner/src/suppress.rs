// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression list management and provider event intake.

use campaigner_config::model::CampaignerConfig;
use campaigner_core::{CampaignerError, DeliveryEventKind, SuppressionReason};
use campaigner_dispatch::SuppressionRegistry;
use campaigner_storage::queries::recipients;
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use crate::app;

#[derive(Subcommand, Debug)]
pub enum SuppressCommand {
    /// Add an address (unsubscribe, bounce, complaint).
    Add {
        address: String,
        #[arg(long, default_value = "unsubscribe")]
        reason: SuppressionReason,
    },
    /// Remove an address from the list.
    Remove { address: String },
    /// Print every suppressed address.
    List,
}

pub async fn run_suppress(
    config: &CampaignerConfig,
    command: SuppressCommand,
) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let registry = SuppressionRegistry::new(db.clone());
    match command {
        SuppressCommand::Add { address, reason } => {
            registry.suppress(&address, reason).await?;
            println!("suppressed {address} ({reason})");
        }
        SuppressCommand::Remove { address } => {
            if registry.unsuppress(&address).await? {
                println!("removed {address}");
            } else {
                println!("{address} was not suppressed");
            }
        }
        SuppressCommand::List => {
            for entry in registry.list().await? {
                println!(
                    "{:<40} {:<12} {}",
                    entry.address,
                    entry.reason.to_string(),
                    entry.recorded_at.to_rfc3339()
                );
            }
        }
    }
    drop(registry);
    db.close().await
}

pub async fn run_event(
    config: &CampaignerConfig,
    provider_message_id: &str,
    kind: DeliveryEventKind,
) -> Result<(), CampaignerError> {
    let db = app::open_database(config).await?;
    let updated =
        recipients::record_delivery_event(&db, provider_message_id, kind, Utc::now()).await?;
    match updated {
        Some(recipient) => {
            info!(
                recipient_id = recipient.id,
                campaign_id = %recipient.campaign_id,
                kind = %kind,
                "delivery event recorded"
            );
            println!("{} -> {}", recipient.address, recipient.status);
        }
        None => println!("no sent message matches {provider_message_id}"),
    }
    db.close().await
}
