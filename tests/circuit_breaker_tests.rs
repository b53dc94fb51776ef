// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end circuit breaker behavior through the resilience gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use whoop_sync::error::SyncError;
use whoop_sync::services::resilience::{CircuitStatus, ResilienceGate};
use whoop_sync::services::PaginatedFetcher;
use whoop_sync::services::StaticTokenProvider;

mod common;
use common::{single_attempt_resilience, ScriptedUpstream};

async fn failing_call(gate: &ResilienceGate, dispatched: &AtomicUsize) -> Result<&'static str, SyncError> {
    gate.call(
        || "fallback",
        || async {
            dispatched.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::UpstreamTransient("HTTP 503".to_string()))
        },
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn test_outage_opens_circuit_and_half_open_admits_k_trials() {
    let config = single_attempt_resilience();
    let trials = config.circuit_breaker.half_open_trials as usize;
    let gate = Arc::new(ResilienceGate::new("whoop", &config));
    let dispatched = Arc::new(AtomicUsize::new(0));

    // Five consecutive failures reach min_calls at 100% failure rate.
    for _ in 0..5 {
        let result = failing_call(&gate, &dispatched).await;
        assert!(matches!(result, Err(SyncError::UpstreamTransient(_))));
    }
    assert_eq!(gate.circuit().status(), CircuitStatus::Open);
    assert_eq!(dispatched.load(Ordering::SeqCst), 5);

    // Open: the fallback is returned without dispatching.
    assert_eq!(failing_call(&gate, &dispatched).await.unwrap(), "fallback");
    assert_eq!(dispatched.load(Ordering::SeqCst), 5);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(gate.circuit().status(), CircuitStatus::HalfOpen);

    // Hold every admitted trial in flight so admissions can be counted.
    let release = Arc::new(Semaphore::new(0));
    let handles: Vec<_> = (0..trials + 2)
        .map(|_| {
            let gate = gate.clone();
            let dispatched = dispatched.clone();
            let release = release.clone();
            tokio::spawn(async move {
                gate.call(
                    || "fallback",
                    || {
                        let dispatched = dispatched.clone();
                        let release = release.clone();
                        async move {
                            dispatched.fetch_add(1, Ordering::SeqCst);
                            let _permit = release.acquire().await;
                            Ok("upstream")
                        }
                    },
                )
                .await
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(dispatched.load(Ordering::SeqCst), 5 + trials);

    release.add_permits(trials + 2);
    let mut fallbacks = 0;
    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            "fallback" => fallbacks += 1,
            "upstream" => successes += 1,
            other => panic!("unexpected result {}", other),
        }
    }
    assert_eq!(successes, trials);
    assert_eq!(fallbacks, 2);
    assert_eq!(gate.circuit().status(), CircuitStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_ends_pagination_with_empty_page() {
    let api = Arc::new(ScriptedUpstream::new());
    api.set_failing(Some(503));
    let gate = Arc::new(ResilienceGate::new("whoop", &single_attempt_resilience()));
    let fetcher = PaginatedFetcher::new(
        api.clone(),
        Arc::new(StaticTokenProvider::new("tok")),
        gate.clone(),
        25,
    );

    for _ in 0..5 {
        assert!(fetcher.fetch_all("/v1/cycle", None).await.is_err());
    }
    assert_eq!(gate.circuit().status(), CircuitStatus::Open);

    let records = fetcher.fetch_all("/v1/cycle", None).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(api.calls().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_auth_failures_never_open_circuit() {
    let api = Arc::new(ScriptedUpstream::new());
    api.set_failing(Some(401));
    let gate = Arc::new(ResilienceGate::new("whoop", &single_attempt_resilience()));
    let fetcher = PaginatedFetcher::new(
        api.clone(),
        Arc::new(StaticTokenProvider::new("tok")),
        gate.clone(),
        25,
    );

    for _ in 0..10 {
        let err = fetcher.fetch_all("/v1/cycle", None).await.unwrap_err();
        assert!(matches!(err, SyncError::UpstreamAuth { status: 401, .. }));
    }
    assert_eq!(gate.circuit().status(), CircuitStatus::Closed);
    assert_eq!(api.calls().len(), 10);
}
