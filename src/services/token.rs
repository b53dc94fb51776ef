// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token lifecycle.
//!
//! [`TokenManager`] owns the stored OAuth token: it refreshes when the token
//! is within five minutes of expiry and persists the replacement before
//! handing it out. Refreshing invalidates the previous access token upstream,
//! so callers must ask for a token before every outbound call instead of
//! holding on to one.

use crate::db::CredentialStore;
use crate::error::SyncError;
use crate::models::OAuthToken;
use crate::services::whoop::UpstreamApi;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Source of a currently valid WHOOP access token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn valid_access_token(&self) -> Result<String, SyncError>;
}

/// Token provider backed by the credential store, with refresh.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    api: Arc<dyn UpstreamApi>,
    margin: Duration,
    /// Last token read or written; also serializes refreshes.
    cached: Mutex<Option<OAuthToken>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, api: Arc<dyn UpstreamApi>) -> Self {
        Self {
            store,
            api,
            margin: Duration::seconds(TOKEN_REFRESH_MARGIN_SECS),
            cached: Mutex::new(None),
        }
    }

    /// Refresh `current` with WHOOP and persist the result.
    async fn refresh(&self, current: &OAuthToken) -> Result<OAuthToken, SyncError> {
        tracing::info!(
            expires_at = %current.expires_at,
            "Access token expiring, refreshing"
        );

        let response = self
            .api
            .refresh_token(&current.refresh_token)
            .await
            .map_err(|e| match e {
                SyncError::RefreshFailed(_) => e,
                other => SyncError::RefreshFailed(other.to_string()),
            })?;

        let refreshed = current.refreshed(response, Utc::now())?;

        // The old access token is already dead upstream; a token we can't
        // persist would be lost on restart, so fail loudly.
        if let Err(e) = self.store.save_token(&refreshed).await {
            tracing::error!(error = %e, "Refreshed token could not be persisted");
            return Err(SyncError::RefreshFailed(format!(
                "refreshed token not persisted: {}",
                e
            )));
        }

        tracing::info!(expires_at = %refreshed.expires_at, "Token refreshed and stored");
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn valid_access_token(&self) -> Result<String, SyncError> {
        let mut cached = self.cached.lock().await;

        let token = match cached.as_ref() {
            Some(token) => token.clone(),
            None => self
                .store
                .load_token()
                .await?
                .ok_or(SyncError::NoTokenStored)?,
        };

        if !token.expires_within(Utc::now(), self.margin) {
            let access_token = token.access_token.clone();
            *cached = Some(token);
            return Ok(access_token);
        }

        match self.refresh(&token).await {
            Ok(refreshed) => {
                let access_token = refreshed.access_token.clone();
                *cached = Some(refreshed);
                Ok(access_token)
            }
            Err(e) => {
                // Re-read the store next time in case a human re-bootstrapped.
                *cached = None;
                Err(e)
            }
        }
    }
}

/// Fixed token, never refreshed. For mock upstreams and manual testing.
pub struct StaticTokenProvider {
    access_token: String,
}

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn valid_access_token(&self) -> Result<String, SyncError> {
        Ok(self.access_token.clone())
    }
}
