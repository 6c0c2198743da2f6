// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters use `#[async_trait]` so they can be held as trait objects.

pub mod delivery;

pub use delivery::DeliveryAdapter;
