// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod page;
pub mod record;
pub mod report;
pub mod token;

pub use page::{RawRecord, UpstreamPage};
pub use record::{
    Cycle, DomainRecord, EntityKind, RecordId, Recovery, ScoreState, Sleep, Workout,
};
pub use report::{KindReport, SyncReport};
pub use token::{expiry_after, OAuthToken, TokenRefreshResponse};
