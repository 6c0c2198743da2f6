// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by the subcommands: storage and the dispatcher stack.

use std::sync::Arc;

use campaigner_config::model::CampaignerConfig;
use campaigner_core::{CampaignerError, DeliveryAdapter};
use campaigner_delivery::{HttpDeliveryClient, RateLimitedClient};
use campaigner_dispatch::Dispatcher;
use campaigner_storage::Database;
use tracing::debug;

/// Open the configured database, running migrations.
pub async fn open_database(config: &CampaignerConfig) -> Result<Database, CampaignerError> {
    debug!(path = %config.storage.database_path, "opening database");
    Database::open_with(&config.storage.database_path, config.storage.wal_mode).await
}

/// The HTTP provider client behind the shared rate limiter.
pub fn build_delivery(config: &CampaignerConfig) -> Result<Arc<dyn DeliveryAdapter>, CampaignerError> {
    let http = HttpDeliveryClient::new(&config.provider)?;
    Ok(Arc::new(RateLimitedClient::new(
        Arc::new(http),
        &config.rate_limit,
    )))
}

pub fn build_dispatcher(
    config: &CampaignerConfig,
    db: Database,
) -> Result<Dispatcher, CampaignerError> {
    Dispatcher::new(db, build_delivery(config)?, config)
}
