// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental sync across all WHOOP entity kinds.
//!
//! Handles, per kind and in order:
//! 1. Watermark = latest stored `updated_at` (none → full history)
//! 2. Fetch every page since the watermark
//! 3. Map and upsert each record; bad records are skipped, not fatal
//!
//! A kind that fails is recorded in the report and the next kind still runs.

use crate::db::RecordStore;
use crate::error::SyncError;
use crate::models::{EntityKind, KindReport, SyncReport};
use crate::services::fetcher::PaginatedFetcher;
use crate::services::mapper::map_record;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

pub struct SyncOrchestrator {
    fetcher: PaginatedFetcher,
    store: Arc<dyn RecordStore>,
    kinds: Vec<EntityKind>,
}

impl SyncOrchestrator {
    pub fn new(fetcher: PaginatedFetcher, store: Arc<dyn RecordStore>) -> Self {
        Self {
            fetcher,
            store,
            kinds: EntityKind::ALL.to_vec(),
        }
    }

    /// Restrict the run to a subset of kinds (kept in the given order).
    pub fn with_kinds(mut self, kinds: &[EntityKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Sync every kind. Never fails: problems end up in the report.
    pub async fn sync_all(&self) -> SyncReport {
        let started_at = Utc::now();
        let timer = Instant::now();
        tracing::info!(kinds = self.kinds.len(), "Sync run starting");

        let mut kinds = Vec::with_capacity(self.kinds.len());
        for &kind in &self.kinds {
            kinds.push(self.sync_kind(kind).await);
        }

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
            kinds,
        };

        tracing::info!(
            upserted = report.total_upserted(),
            skipped = report.total_skipped(),
            failed_kinds = ?report.failed_kinds(),
            duration_ms = report.duration_ms,
            "Sync run finished"
        );
        report
    }

    /// Sync one kind, absorbing any failure into its report.
    pub async fn sync_kind(&self, kind: EntityKind) -> KindReport {
        let timer = Instant::now();

        let watermark = match self.store.latest_updated_at(kind).await {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(%kind, error = %e, "Failed to read watermark");
                let mut report = KindReport::new(kind, None);
                report.error = Some(e.to_string());
                report.duration_ms = timer.elapsed().as_millis() as u64;
                return report;
            }
        };

        let mut report = KindReport::new(kind, watermark);
        match watermark {
            Some(w) => tracing::info!(%kind, watermark = %w, "Incremental sync"),
            None => tracing::info!(%kind, "No local records, requesting full history"),
        }

        if let Err(e) = self.fetch_and_store(kind, &mut report).await {
            if e.is_auth_error() {
                tracing::error!(
                    %kind,
                    error = %e,
                    "Authorization failure, re-run the authorization bootstrap if this persists"
                );
            } else {
                tracing::error!(%kind, error = %e, "Kind sync failed");
            }
            report.error = Some(e.to_string());
        }

        report.duration_ms = timer.elapsed().as_millis() as u64;
        tracing::info!(
            %kind,
            fetched = report.fetched,
            upserted = report.upserted,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "Kind sync finished"
        );
        report
    }

    async fn fetch_and_store(
        &self,
        kind: EntityKind,
        report: &mut KindReport,
    ) -> Result<(), SyncError> {
        let raw_records = self.fetcher.fetch_all(kind.path(), report.watermark).await?;
        report.fetched = raw_records.len();

        for raw in &raw_records {
            let record = match map_record(kind, raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "Skipping invalid record");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.store.upsert(&record).await {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    tracing::warn!(
                        %kind,
                        record_id = %record.id(),
                        error = %e,
                        "Failed to upsert record"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(())
    }
}
