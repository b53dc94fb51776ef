// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encrypted on-disk credential store.
//!
//! The file holds a small JSON envelope; the token itself is serialized to
//! JSON and sealed with AES-256-GCM. Writes go to a sibling temp file and are
//! renamed into place so a crash never leaves a half-written token.

use super::CredentialStore;
use crate::error::SyncError;
use crate::models::{expiry_after, OAuthToken};
use crate::services::crypto::{SealedBox, TokenCipher};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ENVELOPE_VERSION: u32 = 1;

/// Lifetime assumed for a bootstrap token when none is given.
const DEFAULT_BOOTSTRAP_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    sealed: SealedBox,
}

/// Credential store persisting one encrypted token file.
#[derive(Clone, Debug)]
pub struct EncryptedFileCredentialStore {
    path: PathBuf,
    cipher: TokenCipher,
}

impl EncryptedFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, cipher: TokenCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for EncryptedFileCredentialStore {
    async fn load_token(&self) -> Result<Option<OAuthToken>, SyncError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Store(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let envelope: Envelope = serde_json::from_slice(&raw)
            .map_err(|e| SyncError::Store(format!("Corrupt credential file: {}", e)))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(SyncError::Store(format!(
                "Unsupported credential file version {}",
                envelope.version
            )));
        }

        let plaintext = self
            .cipher
            .open(&envelope.sealed)
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let token = serde_json::from_slice(&plaintext)
            .map_err(|e| SyncError::Store(format!("Corrupt token payload: {}", e)))?;
        Ok(Some(token))
    }

    async fn save_token(&self, token: &OAuthToken) -> Result<(), SyncError> {
        let plaintext = serde_json::to_vec(token)
            .map_err(|e| SyncError::Internal(anyhow::anyhow!("Token serialize failed: {}", e)))?;
        let sealed = self
            .cipher
            .seal(&plaintext)
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            sealed,
        };
        let body = serde_json::to_vec_pretty(&envelope).map_err(|e| {
            SyncError::Internal(anyhow::anyhow!("Envelope serialize failed: {}", e))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Store(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| SyncError::Store(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SyncError::Store(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        tracing::debug!(path = %self.path.display(), "Credential file written");
        Ok(())
    }
}

/// Deposit the initial token from `WHOOP_BOOTSTRAP_*` values.
///
/// Only acts when the store is empty and both the access and refresh tokens
/// are supplied. Returns whether a token was written.
pub async fn deposit_bootstrap_token<F>(
    store: &dyn CredentialStore,
    lookup: F,
) -> Result<bool, SyncError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let (Some(access_token), Some(refresh_token)) = (
        get("WHOOP_BOOTSTRAP_ACCESS_TOKEN"),
        get("WHOOP_BOOTSTRAP_REFRESH_TOKEN"),
    ) else {
        return Ok(false);
    };

    if store.load_token().await?.is_some() {
        tracing::info!("Credential store already holds a token, ignoring bootstrap values");
        return Ok(false);
    }

    let expires_in = match get("WHOOP_BOOTSTRAP_EXPIRES_IN") {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            SyncError::Internal(anyhow::anyhow!(
                "WHOOP_BOOTSTRAP_EXPIRES_IN is not a number of seconds: {}",
                raw
            ))
        })?,
        None => DEFAULT_BOOTSTRAP_EXPIRES_IN_SECS,
    };

    let expires_at = expiry_after(Utc::now(), expires_in).ok_or_else(|| {
        SyncError::Internal(anyhow::anyhow!(
            "WHOOP_BOOTSTRAP_EXPIRES_IN is out of range: {}",
            expires_in
        ))
    })?;

    let token = OAuthToken {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_at,
        scope: get("WHOOP_BOOTSTRAP_SCOPE"),
    };
    store.save_token(&token).await?;

    tracing::info!(expires_at = %token.expires_at, "Bootstrap token deposited");
    Ok(true)
}
