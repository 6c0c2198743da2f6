// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery for the Campaigner dispatch engine.
//!
//! [`HttpDeliveryClient`] talks to the provider's HTTP API. [`RateLimitedClient`]
//! wraps any [`DeliveryAdapter`](campaigner_core::DeliveryAdapter) with the
//! provider-side throttles in [`RateLimiter`]. Neither ever retries; retry
//! policy belongs to the dispatcher.

pub mod client;
pub mod http;
pub mod rate_limiter;

pub use client::RateLimitedClient;
pub use http::HttpDeliveryClient;
pub use rate_limiter::{RateLimiter, RatePermit};
