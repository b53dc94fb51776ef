// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for the access token lifecycle.

use chrono::{Duration, Utc};
use std::sync::Arc;
use whoop_sync::db::{CredentialStore, InMemoryCredentialStore};
use whoop_sync::error::SyncError;
use whoop_sync::models::{OAuthToken, TokenRefreshResponse};
use whoop_sync::services::{TokenManager, TokenProvider};

mod common;
use common::ScriptedUpstream;

fn stored_token(expires_in: Duration) -> OAuthToken {
    OAuthToken {
        access_token: "old_access".to_string(),
        refresh_token: "old_refresh".to_string(),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + expires_in,
        scope: Some("offline read:cycles".to_string()),
    }
}

fn refresh_response(refresh_token: Option<&str>) -> TokenRefreshResponse {
    TokenRefreshResponse {
        access_token: "new_access".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in: 3600,
        scope: None,
        token_type: None,
    }
}

fn setup(
    token: Option<OAuthToken>,
) -> (TokenManager, Arc<InMemoryCredentialStore>, Arc<ScriptedUpstream>) {
    let store = Arc::new(InMemoryCredentialStore::new(token));
    let api = Arc::new(ScriptedUpstream::new());
    let manager = TokenManager::new(store.clone(), api.clone());
    (manager, store, api)
}

#[tokio::test]
async fn test_token_near_expiry_is_refreshed_once() {
    let (manager, store, api) = setup(Some(stored_token(Duration::minutes(4))));
    api.set_refresh_response(Some(refresh_response(Some("new_refresh"))));

    let access = manager.valid_access_token().await.unwrap();

    assert_eq!(access, "new_access");
    assert_eq!(api.refresh_count(), 1);
    assert_eq!(api.refresh_tokens_seen(), vec!["old_refresh".to_string()]);

    let persisted = store.load_token().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "new_access");
    assert_eq!(persisted.refresh_token, "new_refresh");
    assert!(persisted.expires_at > Utc::now() + Duration::minutes(55));

    // Fresh now; no second refresh.
    assert_eq!(manager.valid_access_token().await.unwrap(), "new_access");
    assert_eq!(api.refresh_count(), 1);
}

#[tokio::test]
async fn test_token_with_headroom_is_used_as_is() {
    let (manager, _store, api) = setup(Some(stored_token(Duration::minutes(10))));

    let access = manager.valid_access_token().await.unwrap();

    assert_eq!(access, "old_access");
    assert_eq!(api.refresh_count(), 0);
}

#[tokio::test]
async fn test_missing_token_reports_no_token_stored() {
    let (manager, _store, api) = setup(None);

    let err = manager.valid_access_token().await.unwrap_err();

    assert!(matches!(err, SyncError::NoTokenStored));
    assert!(err.is_auth_error());
    assert_eq!(api.refresh_count(), 0);
}

#[tokio::test]
async fn test_rejected_refresh_reports_refresh_failed() {
    let original = stored_token(Duration::minutes(1));
    let (manager, store, api) = setup(Some(original.clone()));
    api.set_refresh_response(None);

    let err = manager.valid_access_token().await.unwrap_err();

    assert!(matches!(err, SyncError::RefreshFailed(_)));
    assert!(err.is_auth_error());
    // The stored token is left untouched for a human to fix.
    assert_eq!(store.load_token().await.unwrap(), Some(original));
}

#[tokio::test]
async fn test_unrepresentable_expires_in_is_refresh_failed() {
    let original = stored_token(Duration::minutes(1));
    let (manager, store, api) = setup(Some(original.clone()));
    let mut response = refresh_response(Some("new_refresh"));
    response.expires_in = i64::MAX;
    api.set_refresh_response(Some(response));
    let manager = Arc::new(manager);

    let result = tokio::spawn({
        let manager = manager.clone();
        async move { manager.valid_access_token().await }
    })
    .await
    .expect("token task must not panic");

    assert!(matches!(result, Err(SyncError::RefreshFailed(_))));
    assert_eq!(store.load_token().await.unwrap(), Some(original));
}

#[tokio::test]
async fn test_omitted_refresh_token_is_kept() {
    let (manager, store, api) = setup(Some(stored_token(Duration::seconds(30))));
    api.set_refresh_response(Some(refresh_response(None)));

    manager.valid_access_token().await.unwrap();

    let persisted = store.load_token().await.unwrap().unwrap();
    assert_eq!(persisted.access_token, "new_access");
    assert_eq!(persisted.refresh_token, "old_refresh");
    assert_eq!(persisted.token_type, "bearer");
    assert_eq!(persisted.scope.as_deref(), Some("offline read:cycles"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let (manager, _store, api) = setup(Some(stored_token(Duration::hours(-2))));
    api.set_refresh_response(Some(refresh_response(Some("r2"))));

    assert_eq!(manager.valid_access_token().await.unwrap(), "new_access");
    assert_eq!(api.refresh_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_refresh() {
    let (manager, _store, api) = setup(Some(stored_token(Duration::minutes(2))));
    api.set_refresh_response(Some(refresh_response(Some("new_refresh"))));
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.valid_access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "new_access");
    }
    assert_eq!(api.refresh_count(), 1);
}
