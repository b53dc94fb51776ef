// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP API client for paginated collection reads and token refresh.
//!
//! Handles:
//! - Collection page fetching (`limit`, `start`, `nextToken`)
//! - OAuth2 refresh (`grant_type=refresh_token`, form-encoded)
//! - Status classification into transient / auth / rejected errors

use crate::config::{HttpConfig, UpstreamConfig};
use crate::error::SyncError;
use crate::models::{TokenRefreshResponse, UpstreamPage};
use crate::time_utils::format_utc_rfc3339_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Query for one collection page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub limit: u32,
    /// Only records at or after this instant (the watermark).
    pub start: Option<DateTime<Utc>>,
    pub next_token: Option<String>,
}

impl PageQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(start) = self.start {
            params.push(("start", format_utc_rfc3339_millis(start)));
        }
        if let Some(token) = &self.next_token {
            params.push(("nextToken", token.clone()));
        }
        params
    }
}

/// The WHOOP operations the ingestion engine depends on.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// GET one page of a collection.
    async fn get_page(
        &self,
        access_token: &str,
        path: &str,
        query: &PageQuery,
    ) -> Result<UpstreamPage, SyncError>;

    /// Exchange a refresh token for a new token set.
    ///
    /// Every failure is reported as [`SyncError::RefreshFailed`].
    async fn refresh_token(&self, refresh_token: &str)
        -> Result<TokenRefreshResponse, SyncError>;
}

/// WHOOP API client over reqwest.
#[derive(Clone)]
pub struct WhoopClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl WhoopClient {
    /// Create a client with connect/read timeouts applied to every request.
    pub fn new(upstream: &UpstreamConfig, http: &HttpConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout)
            .read_timeout(http.read_timeout)
            .user_agent(concat!("whoop-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http: client,
            base_url: upstream.base_url.trim_end_matches('/').to_string(),
            token_url: upstream.token_url.clone(),
            client_id: upstream.client_id.clone(),
            client_secret: upstream.client_secret.clone(),
        })
    }

    /// Check response and parse JSON body.
    ///
    /// A body cut off mid-read is transient. A complete body that does not
    /// decode will not decode on retry either, so it is rejected.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::UpstreamTransient(format!("Failed to read body: {}", e)))?;

        serde_json::from_slice(&body).map_err(|e| SyncError::UpstreamRejected {
            status: status.as_u16(),
            message: format!("JSON parse error: {}", e),
        })
    }
}

/// Map a non-success status to the error taxonomy.
fn classify_status(status: StatusCode, body: String) -> SyncError {
    let code = status.as_u16();
    match code {
        401 | 403 => SyncError::UpstreamAuth {
            status: code,
            message: body,
        },
        429 => {
            tracing::warn!("WHOOP rate limit hit (429)");
            SyncError::UpstreamTransient(format!("HTTP {}: {}", code, body))
        }
        408 | 500..=599 => SyncError::UpstreamTransient(format!("HTTP {}: {}", code, body)),
        _ => SyncError::UpstreamRejected {
            status: code,
            message: body,
        },
    }
}

#[async_trait]
impl UpstreamApi for WhoopClient {
    async fn get_page(
        &self,
        access_token: &str,
        path: &str,
        query: &PageQuery,
    ) -> Result<UpstreamPage, SyncError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| SyncError::UpstreamTransient(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, SyncError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "offline"),
            ])
            .send()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "WHOOP token refresh failed");
            return Err(SyncError::RefreshFailed(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::RefreshFailed(format!("Failed to parse token response: {}", e)))
    }
}
