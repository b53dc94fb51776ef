// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stores backed by `DashMap` / `RwLock`.

use super::{CredentialStore, RecordStore};
use crate::error::SyncError;
use crate::models::{DomainRecord, EntityKind, OAuthToken, RecordId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

/// Record store held in memory. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<DashMap<(EntityKind, RecordId), DomainRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records of one kind, in no particular order.
    pub fn records_of(&self, kind: EntityKind) -> Vec<DomainRecord> {
        self.records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn latest_updated_at(
        &self,
        kind: EntityKind,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.value().updated_at())
            .max())
    }

    async fn upsert(&self, record: &DomainRecord) -> Result<(), SyncError> {
        self.records
            .insert((record.kind(), record.id()), record.clone());
        Ok(())
    }

    async fn count(&self, kind: EntityKind) -> Result<usize, SyncError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .count())
    }

    async fn get(
        &self,
        kind: EntityKind,
        id: &RecordId,
    ) -> Result<Option<DomainRecord>, SyncError> {
        Ok(self
            .records
            .get(&(kind, id.clone()))
            .map(|entry| entry.value().clone()))
    }
}

/// Credential store without persistence, for tests and mock runs.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    token: Arc<RwLock<Option<OAuthToken>>>,
}

impl InMemoryCredentialStore {
    pub fn new(token: Option<OAuthToken>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load_token(&self) -> Result<Option<OAuthToken>, SyncError> {
        self.token
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SyncError::Store("credential lock poisoned".to_string()))
    }

    async fn save_token(&self, token: &OAuthToken) -> Result<(), SyncError> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| SyncError::Store("credential lock poisoned".to_string()))?;
        *guard = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cycle;
    use chrono::TimeZone;

    fn cycle(id: i64, updated_hour: u32, strain: f64) -> DomainRecord {
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, updated_hour, 0, 0).unwrap();
        DomainRecord::Cycle(Cycle {
            id,
            user_id: Some(10129),
            created_at: ts,
            updated_at: ts,
            start: ts,
            end: None,
            timezone_offset: Some("-05:00".to_string()),
            score_state: None,
            strain: Some(strain),
            kilojoule: None,
            average_heart_rate: None,
            max_heart_rate: None,
        })
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = InMemoryRecordStore::new();
        store.upsert(&cycle(1, 8, 5.0)).await.unwrap();
        store.upsert(&cycle(1, 9, 7.5)).await.unwrap();

        assert_eq!(store.count(EntityKind::Cycle).await.unwrap(), 1);
        let stored = store
            .get(EntityKind::Cycle, &RecordId::Numeric(1))
            .await
            .unwrap()
            .unwrap();
        match stored {
            DomainRecord::Cycle(c) => assert_eq!(c.strain, Some(7.5)),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_latest_updated_at_is_per_kind() {
        let store = InMemoryRecordStore::new();
        assert_eq!(
            store.latest_updated_at(EntityKind::Cycle).await.unwrap(),
            None
        );

        store.upsert(&cycle(1, 8, 1.0)).await.unwrap();
        store.upsert(&cycle(2, 11, 1.0)).await.unwrap();
        store.upsert(&cycle(3, 9, 1.0)).await.unwrap();

        assert_eq!(
            store.latest_updated_at(EntityKind::Cycle).await.unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 6, 15, 11, 0, 0).unwrap())
        );
        assert_eq!(
            store.latest_updated_at(EntityKind::Sleep).await.unwrap(),
            None
        );
    }
}
