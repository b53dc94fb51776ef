// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AES-256-GCM sealing for OAuth tokens at rest.
//!
//! Each write draws a fresh random 96-bit nonce; ring appends the 128-bit tag
//! to the ciphertext. The key is supplied out-of-band (base64 in config).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const KEY_LEN: usize = 32;

/// Binds ciphertexts to this purpose so they can't be swapped with other blobs.
const AAD_LABEL: &[u8] = b"whoop-sync/oauth-token/v1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Random nonce generation failed")]
    Rng,

    #[error("Encryption failed")]
    Seal,

    /// Wrong key, corrupted file or tampered ciphertext.
    #[error("Decryption failed: {0}")]
    Open(String),
}

/// Base64 nonce + ciphertext (with tag) as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedBox {
    pub iv: String,
    pub ciphertext: String,
}

/// AES-256-GCM cipher holding the credential key.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    /// Create a cipher from raw key bytes (must be 32 bytes).
    pub fn new(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                key_bytes.len()
            )));
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes)
            .map_err(|_| CryptoError::InvalidKey("rejected by AES-256-GCM".to_string()))?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Create a cipher from a base64-encoded key.
    pub fn from_base64_key(key_b64: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(key_b64.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("base64 decode failed: {}", e)))?;
        Self::new(&bytes)
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedBox, CryptoError> {
        let mut iv = [0u8; NONCE_LEN];
        self.rng.fill(&mut iv).map_err(|_| CryptoError::Rng)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(iv),
                Aad::from(AAD_LABEL),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Seal)?;

        Ok(SealedBox {
            iv: BASE64.encode(iv),
            ciphertext: BASE64.encode(in_out),
        })
    }

    pub fn open(&self, sealed: &SealedBox) -> Result<Vec<u8>, CryptoError> {
        let iv = BASE64
            .decode(&sealed.iv)
            .map_err(|e| CryptoError::Open(format!("iv base64: {}", e)))?;
        let nonce = Nonce::try_assume_unique_for_key(&iv)
            .map_err(|_| CryptoError::Open(format!("iv must be {} bytes", NONCE_LEN)))?;

        let mut in_out = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| CryptoError::Open(format!("ciphertext base64: {}", e)))?;
        if in_out.len() < AES_256_GCM.tag_len() {
            return Err(CryptoError::Open("ciphertext shorter than tag".to_string()));
        }

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(AAD_LABEL), &mut in_out)
            .map_err(|_: ring::error::Unspecified| {
                CryptoError::Open("authentication tag mismatch".to_string())
            })?;

        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}
