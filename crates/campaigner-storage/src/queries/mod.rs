// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for campaigns, the recipient queue, the quota ledger, and
//! the suppression list.

pub mod campaigns;
pub mod quota;
pub mod recipients;
pub mod suppressions;
