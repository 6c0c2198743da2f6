// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppression registry: addresses that must never be sent to.

use campaigner_core::{CampaignerError, SuppressionEntry, SuppressionReason};
use campaigner_storage::Database;
use campaigner_storage::queries::suppressions;
use chrono::Utc;

#[derive(Clone)]
pub struct SuppressionRegistry {
    db: Database,
}

impl SuppressionRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Reason the address is suppressed, if it is. Case-insensitive.
    pub async fn is_suppressed(
        &self,
        address: &str,
    ) -> Result<Option<SuppressionReason>, CampaignerError> {
        Ok(suppressions::lookup(&self.db, address)
            .await?
            .map(|entry| entry.reason))
    }

    pub async fn suppress(
        &self,
        address: &str,
        reason: SuppressionReason,
    ) -> Result<SuppressionEntry, CampaignerError> {
        suppressions::suppress(&self.db, address, reason, Utc::now()).await
    }

    pub async fn unsuppress(&self, address: &str) -> Result<bool, CampaignerError> {
        suppressions::unsuppress(&self.db, address).await
    }

    pub async fn list(&self) -> Result<Vec<SuppressionEntry>, CampaignerError> {
        suppressions::list(&self.db).await
    }
}
