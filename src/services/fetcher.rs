// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cursor-driven pagination over one WHOOP collection.

use crate::error::SyncError;
use crate::models::{RawRecord, UpstreamPage};
use crate::services::resilience::ResilienceGate;
use crate::services::token::TokenProvider;
use crate::services::whoop::{PageQuery, UpstreamApi};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fetches every page of a collection, strictly in cursor order.
pub struct PaginatedFetcher {
    api: Arc<dyn UpstreamApi>,
    tokens: Arc<dyn TokenProvider>,
    gate: Arc<ResilienceGate>,
    page_limit: u32,
}

impl PaginatedFetcher {
    pub fn new(
        api: Arc<dyn UpstreamApi>,
        tokens: Arc<dyn TokenProvider>,
        gate: Arc<ResilienceGate>,
        page_limit: u32,
    ) -> Self {
        Self {
            api,
            tokens,
            gate,
            page_limit,
        }
    }

    /// Fetch all records of `path` updated since `since` (everything if `None`).
    ///
    /// At least one page is always requested. Pagination ends when a page
    /// carries no `next_token`; there is no page cap beyond that. A token is
    /// acquired per page since a refresh mid-loop invalidates the old one.
    /// An open circuit yields an empty page, which ends the loop early.
    pub async fn fetch_all(
        &self,
        path: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, SyncError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let access_token = self.tokens.valid_access_token().await?;
            let query = PageQuery {
                limit: self.page_limit,
                start: since,
                next_token: cursor.take(),
            };

            let page = self
                .gate
                .call(UpstreamPage::empty, || {
                    self.api.get_page(&access_token, path, &query)
                })
                .await?;
            pages += 1;

            tracing::debug!(
                path,
                page = pages,
                records = page.records.len(),
                has_more = page.next_cursor().is_some(),
                "Fetched page"
            );

            cursor = page.next_cursor().map(str::to_string);
            records.extend(page.records);

            if cursor.is_none() {
                break;
            }
        }

        tracing::info!(path, pages, records = records.len(), "Pagination complete");
        Ok(records)
    }
}
