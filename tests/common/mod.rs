// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use whoop_sync::config::{Config, ResilienceConfig};
use whoop_sync::db::InMemoryRecordStore;
use whoop_sync::error::SyncError;
use whoop_sync::models::{RawRecord, TokenRefreshResponse, UpstreamPage};
use whoop_sync::routes::create_router;
use whoop_sync::services::{
    MockUpstream, PaginatedFetcher, PageQuery, ResilienceGate, StaticTokenProvider,
    SyncOrchestrator, SyncTrigger, TokenProvider, UpstreamApi,
};
use whoop_sync::AppState;

/// One recorded `get_page` call.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct PageCall {
    pub access_token: String,
    pub path: String,
    pub query: PageQuery,
}

/// Upstream fake serving pages keyed by `(path, cursor)`.
///
/// Scripted failures are consumed first, then `failing_status` applies to
/// every call, then pages are served. Unknown `(path, cursor)` pairs yield an
/// empty last page.
#[derive(Default)]
pub struct ScriptedUpstream {
    pages: Mutex<HashMap<(String, Option<String>), UpstreamPage>>,
    scripted_failures: Mutex<VecDeque<u16>>,
    failing_status: Mutex<Option<u16>>,
    calls: Mutex<Vec<PageCall>>,
    refresh_response: Mutex<Option<TokenRefreshResponse>>,
    refresh_calls: AtomicUsize,
    refresh_tokens_seen: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `path` at `cursor`, pointing at `next`.
    pub fn page(
        &self,
        path: &str,
        cursor: Option<&str>,
        records: Vec<RawRecord>,
        next: Option<&str>,
    ) -> &Self {
        self.pages.lock().unwrap().insert(
            (path.to_string(), cursor.map(str::to_string)),
            UpstreamPage {
                records,
                next_token: next.map(str::to_string),
            },
        );
        self
    }

    /// Fail the next call with `status`.
    pub fn fail_next(&self, status: u16) -> &Self {
        self.scripted_failures.lock().unwrap().push_back(status);
        self
    }

    /// Fail every call with `status` until cleared with `None`.
    pub fn set_failing(&self, status: Option<u16>) {
        *self.failing_status.lock().unwrap() = status;
    }

    pub fn set_refresh_response(&self, response: Option<TokenRefreshResponse>) {
        *self.refresh_response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, path: &str) -> Vec<PageCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }
}

fn status_error(status: u16) -> SyncError {
    match status {
        401 | 403 => SyncError::UpstreamAuth {
            status,
            message: "unauthorized".to_string(),
        },
        408 | 429 | 500..=599 => SyncError::UpstreamTransient(format!("HTTP {}", status)),
        _ => SyncError::UpstreamRejected {
            status,
            message: "rejected".to_string(),
        },
    }
}

#[async_trait]
impl UpstreamApi for ScriptedUpstream {
    async fn get_page(
        &self,
        access_token: &str,
        path: &str,
        query: &PageQuery,
    ) -> Result<UpstreamPage, SyncError> {
        self.calls.lock().unwrap().push(PageCall {
            access_token: access_token.to_string(),
            path: path.to_string(),
            query: query.clone(),
        });

        if let Some(status) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(status_error(status));
        }
        if let Some(status) = *self.failing_status.lock().unwrap() {
            return Err(status_error(status));
        }

        let key = (path.to_string(), query.next_token.clone());
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(UpstreamPage::empty))
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, SyncError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        // Let concurrent callers pile up behind the refresh.
        tokio::task::yield_now().await;

        self.refresh_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SyncError::RefreshFailed("invalid_grant".to_string()))
    }
}

/// Parse an RFC3339 timestamp in tests.
#[allow(dead_code)]
pub fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .unwrap()
        .with_timezone(&Utc)
}

/// `2024-06-01T00:00:00Z` plus `minutes`, formatted as WHOOP does.
#[allow(dead_code)]
pub fn minute_stamp(minutes: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (base + chrono::Duration::minutes(minutes))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn object(value: Value) -> RawRecord {
    assert!(value.is_object(), "fixture must be a JSON object");
    value
}

#[allow(dead_code)]
pub fn cycle_json(id: i64, updated_at: &str) -> RawRecord {
    object(json!({
        "id": id,
        "user_id": 10129,
        "created_at": "2024-06-01T08:00:00.000Z",
        "updated_at": updated_at,
        "start": "2024-06-01T06:00:00.000Z",
        "end": null,
        "timezone_offset": "-08:00",
        "score_state": "SCORED",
        "score": {
            "strain": 9.4,
            "kilojoule": 8100.5,
            "average_heart_rate": 64,
            "max_heart_rate": 151
        }
    }))
}

#[allow(dead_code)]
pub fn recovery_json(cycle_id: i64, updated_at: &str) -> RawRecord {
    object(json!({
        "cycle_id": cycle_id,
        "sleep_id": format!("sleep-{}", cycle_id),
        "user_id": 10129,
        "created_at": "2024-06-01T08:00:00.000Z",
        "updated_at": updated_at,
        "score_state": "SCORED",
        "score": {
            "user_calibrating": false,
            "recovery_score": 61.0,
            "resting_heart_rate": 52.0,
            "hrv_rmssd_milli": 48.2
        }
    }))
}

#[allow(dead_code)]
pub fn sleep_json(id: &str, updated_at: &str) -> RawRecord {
    object(json!({
        "id": id,
        "user_id": 10129,
        "created_at": "2024-06-01T07:10:00.000Z",
        "updated_at": updated_at,
        "start": "2024-05-31T23:00:00.000Z",
        "end": "2024-06-01T07:00:00.000Z",
        "timezone_offset": "-08:00",
        "nap": false,
        "score_state": "PENDING_SCORE"
    }))
}

#[allow(dead_code)]
pub fn workout_json(id: &str, updated_at: &str) -> RawRecord {
    object(json!({
        "id": id,
        "user_id": 10129,
        "created_at": "2024-06-01T10:00:00.000Z",
        "updated_at": updated_at,
        "start": "2024-06-01T09:00:00.000Z",
        "end": "2024-06-01T09:45:00.000Z",
        "timezone_offset": "-08:00",
        "sport_id": 1,
        "sport_name": "cycling",
        "score_state": "SCORED",
        "score": {
            "strain": 11.2,
            "average_heart_rate": 138,
            "max_heart_rate": 171
        }
    }))
}

/// Resilience settings with a single attempt and a generous rate budget.
#[allow(dead_code)]
pub fn single_attempt_resilience() -> ResilienceConfig {
    let mut config = ResilienceConfig::default();
    config.retry.max_attempts = 1;
    config.rate_limit.permits = 10_000;
    config
}

/// Fetcher + orchestrator over `api`, using a static token.
#[allow(dead_code)]
pub fn orchestrator(
    api: Arc<dyn UpstreamApi>,
    store: InMemoryRecordStore,
    resilience: &ResilienceConfig,
) -> (SyncOrchestrator, Arc<ResilienceGate>) {
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new("test_access_token"));
    let gate = Arc::new(ResilienceGate::new("whoop", resilience));
    let fetcher = PaginatedFetcher::new(api, tokens, gate.clone(), 25);
    (SyncOrchestrator::new(fetcher, Arc::new(store)), gate)
}

/// Create a test app over the mock upstream.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let anchor = Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap();
    let store = InMemoryRecordStore::new();
    let (orchestrator, gate) = orchestrator(
        Arc::new(MockUpstream::new(anchor, 5)),
        store.clone(),
        &config.resilience,
    );
    let trigger = SyncTrigger::new(Arc::new(orchestrator), config.sync.interval);

    let state = Arc::new(AppState {
        config,
        trigger,
        store: Arc::new(store),
        gate,
    });

    (create_router(state.clone()), state)
}
