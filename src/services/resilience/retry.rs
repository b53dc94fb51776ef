// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exponential backoff for transient WHOOP failures.

use crate::config::RetryConfig;
use backon::ExponentialBuilder;
use std::time::Duration;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry settings turned into a backon strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts including the first call.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Backoff between attempts: `base_wait`, then `base_wait * multiplier`, ...
    ///
    /// No jitter, so the schedule is predictable in logs and tests.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.base_wait)
            .with_max_delay(MAX_BACKOFF)
            .with_factor(self.config.multiplier)
            .with_max_times((self.max_attempts() - 1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;

    #[test]
    fn test_backoff_schedule_doubles() {
        let policy = RetryPolicy::new(RetryConfig::default());
        let delays: Vec<Duration> = policy.backoff().build().collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_single_attempt_means_no_retries() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        });
        assert_eq!(policy.backoff().build().count(), 0);
    }
}
