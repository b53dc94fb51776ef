// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage collaborators: the record store and the credential store.

pub mod credentials;
pub mod memory;

pub use credentials::{deposit_bootstrap_token, EncryptedFileCredentialStore};
pub use memory::{InMemoryCredentialStore, InMemoryRecordStore};

use crate::error::SyncError;
use crate::models::{DomainRecord, EntityKind, OAuthToken, RecordId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Local store of synced records, keyed by upstream ID within each kind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Most recent `updated_at` among stored records of `kind` (the sync watermark).
    async fn latest_updated_at(&self, kind: EntityKind)
        -> Result<Option<DateTime<Utc>>, SyncError>;

    /// Insert, or replace the record with the same kind and ID.
    async fn upsert(&self, record: &DomainRecord) -> Result<(), SyncError>;

    async fn count(&self, kind: EntityKind) -> Result<usize, SyncError>;

    async fn get(&self, kind: EntityKind, id: &RecordId)
        -> Result<Option<DomainRecord>, SyncError>;
}

/// Persistence for the single account's OAuth token. Encryption is internal.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load_token(&self) -> Result<Option<OAuthToken>, SyncError>;

    async fn save_token(&self, token: &OAuthToken) -> Result<(), SyncError>;
}
