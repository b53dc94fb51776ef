// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token model shared by the credential store and token lifecycle.

use crate::error::SyncError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// `now + expires_in` seconds, or `None` when that is not a representable instant.
pub fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(expires_in).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// The single WHOOP account's OAuth2 token set (plaintext form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl OAuthToken {
    /// Whether the token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    /// Build the successor token from a refresh response.
    ///
    /// WHOOP may omit `refresh_token` and `scope`; the previous values carry over.
    /// An `expires_in` too large to turn into an expiry fails the refresh.
    pub fn refreshed(
        &self,
        response: TokenRefreshResponse,
        now: DateTime<Utc>,
    ) -> Result<Self, SyncError> {
        let expires_at = expiry_after(now, response.expires_in).ok_or_else(|| {
            SyncError::RefreshFailed(format!("invalid expires_in: {}", response.expires_in))
        })?;

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            token_type: response
                .token_type
                .unwrap_or_else(|| self.token_type.clone()),
            expires_at,
            scope: response.scope.or_else(|| self.scope.clone()),
        })
    }
}

/// Token endpoint response for `grant_type=refresh_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}
