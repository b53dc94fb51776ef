// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Counters produced by a sync run.

use super::EntityKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one `sync_all` run. Always produced, even when WHOOP is down.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub kinds: Vec<KindReport>,
}

impl SyncReport {
    pub fn kind(&self, kind: EntityKind) -> Option<&KindReport> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    pub fn total_upserted(&self) -> usize {
        self.kinds.iter().map(|k| k.upserted).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.kinds.iter().map(|k| k.skipped).sum()
    }

    /// Kinds that aborted before finishing their fetch.
    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.kinds
            .iter()
            .filter(|k| k.error.is_some())
            .map(|k| k.kind)
            .collect()
    }
}

/// Per-kind counters.
#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    pub kind: EntityKind,
    /// Watermark sent as `start`; `None` means full history was requested.
    pub watermark: Option<DateTime<Utc>>,
    /// Raw records received from WHOOP.
    pub fetched: usize,
    pub upserted: usize,
    /// Records rejected by the mapper.
    pub skipped: usize,
    /// Records the store refused.
    pub failed: usize,
    /// Set when the kind aborted (token, auth or exhausted retries).
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl KindReport {
    pub fn new(kind: EntityKind, watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            watermark,
            fetched: 0,
            upserted: 0,
            skipped: 0,
            failed: 0,
            error: None,
            duration_ms: 0,
        }
    }
}
