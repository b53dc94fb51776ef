// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! WHOOP-Sync: incremental ingestion of WHOOP physiological data
//!
//! This crate pulls cycles, recoveries, sleeps and workouts from the WHOOP
//! developer API into a local record store, keeping the OAuth token fresh and
//! shielding WHOOP behind rate limiting, retry and a circuit breaker.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RecordStore;
use services::{ResilienceGate, SyncTrigger};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub trigger: Arc<SyncTrigger>,
    pub store: Arc<dyn RecordStore>,
    pub gate: Arc<ResilienceGate>,
}
