// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `campaigner serve` command implementation.
//!
//! Opens storage, assembles the dispatcher with the rate-limited HTTP
//! provider client, and runs one tick per `dispatch.tick_interval_secs`
//! until a shutdown signal arrives.

use std::time::Duration;

use campaigner_config::model::CampaignerConfig;
use campaigner_core::CampaignerError;
use campaigner_dispatch::Dispatcher;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{app, shutdown};

pub async fn run_serve(config: CampaignerConfig) -> Result<(), CampaignerError> {
    info!(
        name = %config.service.name,
        daily_limit = config.quota.daily_limit,
        interval_secs = config.dispatch.tick_interval_secs,
        "starting campaigner serve"
    );

    let db = app::open_database(&config).await?;
    let dispatcher = app::build_dispatcher(&config, db.clone())?;
    let cancel = shutdown::install_signal_handler();

    let ticks = run_loop(&dispatcher, config.dispatch.tick_interval(), cancel).await;

    drop(dispatcher);
    db.close().await?;
    info!(ticks, "campaigner serve shutdown complete");
    Ok(())
}

/// Tick immediately, then once per `interval`, until `cancel` fires.
///
/// Returns the number of ticks started.
pub async fn run_loop(
    dispatcher: &Dispatcher,
    interval: Duration,
    cancel: CancellationToken,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    // A long tick pushes the next one back instead of firing a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("dispatch loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                ticks += 1;
                match dispatcher.tick().await {
                    Ok(report) => debug!(
                        tick = ticks,
                        processed = report.processed(),
                        quota_exhausted = report.quota_exhausted,
                        "tick complete"
                    ),
                    Err(e) => error!(error = %e, "tick failed"),
                }
            }
        }
    }
    ticks
}
