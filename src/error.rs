// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the ingestion engine and the ops HTTP surface.

use crate::models::EntityKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures raised while talking to WHOOP or the local stores.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No token has been deposited yet; the authorization bootstrap must be run.
    #[error("No OAuth token stored (run the authorization bootstrap)")]
    NoTokenStored,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Local rate limiter had no permit within its timeout. No upstream call was made.
    #[error("Rate limited locally, no permit available")]
    RateLimited,

    #[error("Circuit breaker open, call not dispatched")]
    CircuitOpen,

    /// Network failure, timeout, 429 or 5xx.
    #[error("WHOOP API transient error: {0}")]
    UpstreamTransient(String),

    /// 401/403: the access token is no longer accepted.
    #[error("WHOOP API rejected credentials (HTTP {status}): {message}")]
    UpstreamAuth { status: u16, message: String },

    #[error("WHOOP API rejected request (HTTP {status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("Invalid {kind} record {record_id}: {reason}")]
    Validation {
        kind: EntityKind,
        record_id: String,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::UpstreamTransient(_))
    }

    /// Whether the failure points at token invalidity rather than an outage.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SyncError::NoTokenStored | SyncError::RefreshFailed(_) | SyncError::UpstreamAuth { .. }
        )
    }

    pub(crate) fn validation(
        kind: EntityKind,
        record_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SyncError::Validation {
            kind,
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Admin token required")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
