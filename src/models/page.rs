// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP collection page wire format.

use serde::{Deserialize, Serialize};

/// One upstream record, untyped. Never persisted.
///
/// Kept as an arbitrary JSON value so a malformed entry only fails itself
/// in the mapper, not the whole page.
pub type RawRecord = serde_json::Value;

/// `{"records": [...], "next_token": "..."|null}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamPage {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub next_token: Option<String>,
}

impl UpstreamPage {
    /// Fallback used when the circuit is open: no records, no continuation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Continuation cursor. An empty string ends pagination like `null` does.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}
