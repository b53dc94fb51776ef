// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side rate limiter for WHOOP calls.

use crate::config::RateLimitConfig;
use crate::error::SyncError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket holding `permits` permits, refilled over `period`.
///
/// Callers wait up to `timeout` for a permit and fail with
/// [`SyncError::RateLimited`] otherwise.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    timeout: Duration,
}

impl ApiRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let permits = NonZeroU32::new(config.permits).unwrap_or(NonZeroU32::MIN);
        let replenish = config.period / permits.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(permits))
            .allow_burst(permits);

        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
            timeout: config.timeout,
        }
    }

    /// Take one permit, waiting at most the configured timeout.
    pub async fn acquire(&self) -> Result<(), SyncError> {
        if self.inner.check().is_ok() {
            return Ok(());
        }

        tracing::debug!(
            timeout_ms = self.timeout.as_millis() as u64,
            "Rate limit budget exhausted, waiting for permit"
        );

        tokio::time::timeout(self.timeout, self.inner.until_ready())
            .await
            .map_err(|_| {
                tracing::warn!("No rate limit permit within timeout");
                SyncError::RateLimited
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_up_to_permits() {
        let limiter = ApiRateLimiter::new(&RateLimitConfig {
            permits: 3,
            period: Duration::from_secs(60),
            timeout: Duration::from_millis(20),
        });

        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        assert!(matches!(
            limiter.acquire().await,
            Err(SyncError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_waits_for_refill_within_timeout() {
        let limiter = ApiRateLimiter::new(&RateLimitConfig {
            permits: 1,
            period: Duration::from_millis(50),
            timeout: Duration::from_secs(2),
        });

        limiter.acquire().await.unwrap();
        // next permit frees up after ~50ms, well inside the timeout
        limiter.acquire().await.unwrap();
    }
}
