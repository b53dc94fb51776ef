// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Count-based circuit breaker.
//!
//! Closed: outcomes go into a ring buffer of the last `window_size` calls; once
//! `min_calls` outcomes are recorded and the failure rate reaches the
//! threshold, the circuit opens. Open: calls are rejected without dispatch
//! until `open_wait` elapses. Half-open: up to `half_open_trials` calls are
//! admitted; all of them succeeding closes the circuit, any failure reopens it.

use crate::config::CircuitBreakerConfig;
use crate::error::SyncError;
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time view for logging and the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub status: CircuitStatus,
    pub recorded_calls: usize,
    pub failure_rate_percent: Option<f64>,
}

#[derive(Debug)]
struct CircuitState {
    status: CircuitStatus,
    /// `true` = failure. Newest at the back.
    recent_outcomes: VecDeque<bool>,
    opened_at: Option<Instant>,
    trials_admitted: u32,
    trials_succeeded: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = config.window_size.max(1);
        Self {
            name: name.into(),
            config,
            state: Mutex::new(CircuitState {
                status: CircuitStatus::Closed,
                recent_outcomes: VecDeque::with_capacity(window),
                opened_at: None,
                trials_admitted: 0,
                trials_succeeded: 0,
            }),
        }
    }

    /// Current status, applying the open → half-open timeout.
    pub fn status(&self) -> CircuitStatus {
        let mut state = self.lock();
        self.maybe_half_open(&mut state);
        state.status
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut state = self.lock();
        self.maybe_half_open(&mut state);
        let recorded = state.recent_outcomes.len();
        CircuitSnapshot {
            name: self.name.clone(),
            status: state.status,
            recorded_calls: recorded,
            failure_rate_percent: (recorded > 0).then(|| failure_rate(&state.recent_outcomes)),
        }
    }

    /// Run `op` if the circuit admits it.
    ///
    /// Transient failures count against the circuit. Other errors (auth,
    /// rejected requests) say nothing about upstream health and are ignored.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        self.acquire()?;

        let result = op().await;
        match &result {
            Ok(_) => self.on_success(),
            Err(e) if e.is_transient() => self.on_failure(),
            Err(_) => self.on_ignored(),
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, CircuitState> {
        // State is plain data; a panic mid-update can't leave it unusable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn maybe_half_open(&self, state: &mut CircuitState) {
        if state.status == CircuitStatus::Open {
            let elapsed = state
                .opened_at
                .map(|at| at.elapsed() >= self.config.open_wait)
                .unwrap_or(true);
            if elapsed {
                state.status = CircuitStatus::HalfOpen;
                state.trials_admitted = 0;
                state.trials_succeeded = 0;
                tracing::info!(circuit = %self.name, "Circuit half-open, admitting trial calls");
            }
        }
    }

    fn acquire(&self) -> Result<(), SyncError> {
        let mut state = self.lock();
        self.maybe_half_open(&mut state);

        match state.status {
            CircuitStatus::Closed => Ok(()),
            CircuitStatus::Open => Err(SyncError::CircuitOpen),
            CircuitStatus::HalfOpen => {
                if state.trials_admitted < self.config.half_open_trials {
                    state.trials_admitted += 1;
                    Ok(())
                } else {
                    Err(SyncError::CircuitOpen)
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.lock();
        match state.status {
            CircuitStatus::Closed => self.record(&mut state, false),
            CircuitStatus::HalfOpen => {
                state.trials_succeeded += 1;
                if state.trials_succeeded >= self.config.half_open_trials {
                    state.status = CircuitStatus::Closed;
                    state.recent_outcomes.clear();
                    state.opened_at = None;
                    tracing::info!(circuit = %self.name, "Circuit closed after successful trials");
                }
            }
            // Dispatched before the circuit opened.
            CircuitStatus::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut state = self.lock();
        match state.status {
            CircuitStatus::Closed => {
                self.record(&mut state, true);
                let recorded = state.recent_outcomes.len();
                if recorded >= self.config.min_calls {
                    let rate = failure_rate(&state.recent_outcomes);
                    if rate >= f64::from(self.config.failure_threshold_percent) {
                        tracing::warn!(
                            circuit = %self.name,
                            failure_rate = rate,
                            recorded,
                            "Circuit opened"
                        );
                        self.open(&mut state);
                    }
                }
            }
            CircuitStatus::HalfOpen => {
                tracing::warn!(circuit = %self.name, "Trial call failed, circuit reopened");
                self.open(&mut state);
            }
            CircuitStatus::Open => {}
        }
    }

    fn on_ignored(&self) {
        let mut state = self.lock();
        if state.status == CircuitStatus::HalfOpen {
            // Give the trial slot back; the call proved nothing either way.
            state.trials_admitted = state.trials_admitted.saturating_sub(1);
        }
    }

    fn record(&self, state: &mut CircuitState, failed: bool) {
        if state.recent_outcomes.len() == self.config.window_size.max(1) {
            state.recent_outcomes.pop_front();
        }
        state.recent_outcomes.push_back(failed);
    }

    fn open(&self, state: &mut CircuitState) {
        state.status = CircuitStatus::Open;
        state.opened_at = Some(Instant::now());
        state.trials_admitted = 0;
        state.trials_succeeded = 0;
    }
}

fn failure_rate(outcomes: &VecDeque<bool>) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    let failures = outcomes.iter().filter(|failed| **failed).count();
    failures as f64 * 100.0 / outcomes.len() as f64
}
