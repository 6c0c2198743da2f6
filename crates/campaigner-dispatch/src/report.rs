// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tick summary returned by the dispatcher.

use serde::Serialize;

/// What one recipient's processing ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecipientResult {
    Sent,
    Suppressed,
    Retried,
    Failed,
    /// Quota ran out; back to pending with the quota deferral.
    Deferred,
    /// Outcome write lost the claim or a storage call failed.
    Abandoned,
}

/// Counts for one dispatcher tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Campaigns the tick started working on.
    pub campaigns_processed: usize,
    /// Campaigns that moved to `sent` during the tick.
    pub campaigns_completed: Vec<String>,
    pub sent: usize,
    pub suppressed: usize,
    pub retried: usize,
    pub failed: usize,
    pub deferred: usize,
    pub abandoned: usize,
    /// Stale `sending` recipients reset at the start of the tick.
    pub recovered: usize,
    /// The daily quota ran out before or during the tick.
    pub quota_exhausted: bool,
    /// The tick stopped starting campaigns because its time budget elapsed.
    pub budget_exhausted: bool,
}

impl TickReport {
    pub(crate) fn record(&mut self, result: RecipientResult) {
        match result {
            RecipientResult::Sent => self.sent += 1,
            RecipientResult::Suppressed => self.suppressed += 1,
            RecipientResult::Retried => self.retried += 1,
            RecipientResult::Failed => self.failed += 1,
            RecipientResult::Deferred => self.deferred += 1,
            RecipientResult::Abandoned => self.abandoned += 1,
        }
    }

    /// Recipients the tick wrote an outcome for.
    pub fn processed(&self) -> usize {
        self.sent + self.suppressed + self.retried + self.failed + self.deferred
    }
}
