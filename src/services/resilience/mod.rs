// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resilience policies wrapped around every outbound WHOOP call.
//!
//! Composition is fixed: rate limit → retry → circuit breaker → call.
//! One permit covers the whole retry sequence; each retry attempt passes
//! through the circuit breaker on its own.

pub mod circuit_breaker;
pub mod rate_limit;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitStatus};
pub use rate_limit::ApiRateLimiter;
pub use retry::RetryPolicy;

use crate::config::ResilienceConfig;
use crate::error::SyncError;
use backon::Retryable;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

/// Decorator applying rate limiting, retry and circuit breaking to a call.
pub struct ResilienceGate {
    rate_limiter: ApiRateLimiter,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilienceGate {
    /// Create a gate for one upstream resource group.
    pub fn new(name: &str, config: &ResilienceConfig) -> Self {
        Self {
            rate_limiter: ApiRateLimiter::new(&config.rate_limit),
            retry: RetryPolicy::new(config.retry.clone()),
            breaker: CircuitBreaker::new(name, config.circuit_breaker.clone()),
        }
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `op` through the policies, returning `fallback()` if the circuit
    /// short-circuits it.
    ///
    /// `RateLimited` fails fast; only transient upstream errors are retried.
    pub async fn call<T, F, Fut, D>(&self, fallback: D, op: F) -> Result<T, SyncError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
        D: FnOnce() -> T,
    {
        match self.execute(op).await {
            Err(SyncError::CircuitOpen) => {
                tracing::warn!(
                    circuit = %self.breaker.snapshot().name,
                    "Circuit open, returning fallback"
                );
                Ok(fallback())
            }
            other => other,
        }
    }

    /// Run `op` through the policies without a fallback.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, SyncError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        self.rate_limiter.acquire().await?;

        let attempt = AtomicU32::new(0);
        let attempt = &attempt;
        let breaker = &self.breaker;
        let op = &op;
        let max_attempts = self.retry.max_attempts();

        let guarded = move || async move {
            attempt.fetch_add(1, Ordering::SeqCst);
            breaker.call(op).await
        };

        guarded
            .retry(self.retry.backoff())
            .sleep(tokio::time::sleep)
            .when(SyncError::is_transient)
            .notify(|err: &SyncError, delay| {
                tracing::warn!(
                    attempt = attempt.load(Ordering::SeqCst),
                    max_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient WHOOP failure, retrying"
                );
            })
            .await
    }
}
