// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-side throttling.
//!
//! Three independent limits, all in memory and reset on restart:
//!
//! - at most `requests_per_window` call starts in any rolling `window`
//! - at most `max_concurrency` calls in flight
//! - at least `min_spacing` between consecutive call starts
//!
//! This is unrelated to the daily quota, which is persistent and enforced by
//! the quota ledger before a send is attempted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use campaigner_config::model::RateLimitConfig;
use campaigner_core::CampaignerError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

#[derive(Debug)]
struct Window {
    /// Start times of calls inside the current window, oldest first.
    starts: VecDeque<Instant>,
    last_start: Option<Instant>,
}

/// Sliding-window, concurrency, and spacing limiter.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_window: usize,
    window: Duration,
    min_spacing: Duration,
    max_concurrency: usize,
    permits: Arc<Semaphore>,
    state: Mutex<Window>,
}

/// Held for the duration of one provider call; releases the concurrency slot on drop.
#[derive(Debug)]
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(
            config.requests_per_window as usize,
            config.window(),
            config.max_concurrency,
            config.min_spacing(),
        )
    }

    pub fn with_limits(
        requests_per_window: usize,
        window: Duration,
        max_concurrency: usize,
        min_spacing: Duration,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            requests_per_window: requests_per_window.max(1),
            window,
            min_spacing,
            max_concurrency,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            state: Mutex::new(Window {
                starts: VecDeque::new(),
                last_start: None,
            }),
        }
    }

    /// Wait until a call may start, then return a permit for it.
    pub async fn acquire(&self) -> Result<RatePermit, CampaignerError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| CampaignerError::Internal(format!("rate limiter closed: {e}")))?;

        loop {
            let wait = self.reserve_or_wait(Instant::now());
            if wait.is_zero() {
                return Ok(RatePermit { _permit: permit });
            }
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Record a call start at `now` if every limit allows it; otherwise return
    /// how long to wait before trying again.
    fn reserve_or_wait(&self, now: Instant) -> Duration {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        while let Some(&oldest) = state.starts.front() {
            if now.duration_since(oldest) >= self.window {
                state.starts.pop_front();
            } else {
                break;
            }
        }

        let spacing_wait = state
            .last_start
            .map(|last| (last + self.min_spacing).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);
        let window_wait = if state.starts.len() >= self.requests_per_window {
            state
                .starts
                .front()
                .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };

        let wait = spacing_wait.max(window_wait);
        if wait.is_zero() {
            state.starts.push_back(now);
            state.last_start = Some(now);
        }
        wait
    }

    /// Calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.max_concurrency
            .saturating_sub(self.permits.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn window_caps_requests() {
        let limiter = RateLimiter::with_limits(3, Duration::from_secs(10), 10, Duration::ZERO);
        let start = Instant::now();

        for _ in 0..3 {
            drop(limiter.acquire().await.unwrap());
        }
        assert_eq!(Instant::now(), start);

        // Fourth call waits for the oldest start to leave the window.
        drop(limiter.acquire().await.unwrap());
        assert_eq!(Instant::now() - start, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_separates_call_starts() {
        let limiter =
            RateLimiter::with_limits(100, Duration::from_secs(60), 10, Duration::from_millis(250));
        let start = Instant::now();

        drop(limiter.acquire().await.unwrap());
        drop(limiter.acquire().await.unwrap());
        drop(limiter.acquire().await.unwrap());
        assert_eq!(Instant::now() - start, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_cap_blocks_until_permit_dropped() {
        let limiter = Arc::new(RateLimiter::with_limits(
            100,
            Duration::from_secs(60),
            1,
            Duration::ZERO,
        ));
        let held = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 1);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn builds_from_config() {
        let config = RateLimitConfig::default();
        let limiter = RateLimiter::new(&config);
        assert_eq!(limiter.requests_per_window, 100);
        assert_eq!(limiter.window, Duration::from_secs(60));
        assert_eq!(limiter.min_spacing, Duration::from_millis(100));
    }
}
