// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Campaigner integration tests.
//!
//! Provides a scripted delivery client and a harness that wires a temp
//! SQLite database and a [`Dispatcher`](campaigner_dispatch::Dispatcher)
//! together, for fast, deterministic tests without a real provider.
//!
//! # Components
//!
//! - [`MockDeliveryClient`] - Delivery adapter with scripted outcomes and call capture
//! - [`TestHarness`] - Temp database, dispatcher, and seeding helpers

pub mod harness;
pub mod mock_delivery;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_delivery::{MockDeliveryClient, MockResponse};
