// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod crypto;
pub mod fetcher;
pub mod mapper;
pub mod mock_data;
pub mod resilience;
pub mod scheduler;
pub mod sync;
pub mod token;
pub mod whoop;

pub use crypto::{CryptoError, TokenCipher};
pub use fetcher::PaginatedFetcher;
pub use mapper::map_record;
pub use mock_data::MockUpstream;
pub use resilience::ResilienceGate;
pub use scheduler::SyncTrigger;
pub use sync::SyncOrchestrator;
pub use token::{StaticTokenProvider, TokenManager, TokenProvider};
pub use whoop::{PageQuery, UpstreamApi, WhoopClient};
