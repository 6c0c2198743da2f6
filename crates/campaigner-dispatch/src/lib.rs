// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota-bounded batch dispatch for bulk email campaigns.
//!
//! The [`Dispatcher`] is invoked once per tick. It picks up due campaigns,
//! sizes each batch to the remaining daily quota, and for every claimed
//! recipient runs: suppression check, claim-before-send against the
//! [`QuotaLedger`], then one delivery call through the injected
//! [`DeliveryAdapter`](campaigner_core::DeliveryAdapter).

pub mod dispatcher;
pub mod ledger;
pub mod personalize;
pub mod queue;
pub mod report;
pub mod suppression;

pub use dispatcher::Dispatcher;
pub use ledger::QuotaLedger;
pub use personalize::Personalizer;
pub use queue::RecipientQueue;
pub use report::TickReport;
pub use suppression::SuppressionRegistry;
