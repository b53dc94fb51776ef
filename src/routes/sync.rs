// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync status and manual trigger routes.

use crate::error::{AppError, Result};
use crate::models::{EntityKind, SyncReport};
use crate::services::resilience::CircuitSnapshot;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/sync/status", get(sync_status))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/sync/run", post(run_sync))
}

#[derive(Serialize)]
pub struct SyncStatusResponse {
    pub running: bool,
    pub circuit: CircuitSnapshot,
    pub record_counts: BTreeMap<EntityKind, usize>,
    pub last_report: Option<SyncReport>,
}

#[derive(Serialize)]
pub struct SyncStartedResponse {
    pub status: String,
}

/// GET /sync/status
async fn sync_status(State(state): State<Arc<AppState>>) -> Result<Json<SyncStatusResponse>> {
    let mut record_counts = BTreeMap::new();
    for kind in EntityKind::ALL {
        let count = state
            .store
            .count(kind)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        record_counts.insert(kind, count);
    }

    Ok(Json(SyncStatusResponse {
        running: state.trigger.is_running(),
        circuit: state.gate.circuit().snapshot(),
        record_counts,
        last_report: state.trigger.last_report(),
    }))
}

/// POST /sync/run
///
/// Starts a run in the background and returns immediately.
async fn run_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SyncStartedResponse>)> {
    let guard = state
        .trigger
        .try_claim()
        .ok_or_else(|| AppError::Conflict("a sync run is already in progress".to_string()))?;

    tracing::info!("Manual sync triggered");
    let trigger = state.trigger.clone();
    tokio::spawn(async move {
        trigger.run_claimed(guard).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncStartedResponse {
            status: "started".to_string(),
        }),
    ))
}
