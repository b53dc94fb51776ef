// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP-Sync Server
//!
//! Periodically pulls WHOOP cycles, recoveries, sleeps and workouts into the
//! local record store and exposes a small operational HTTP surface.

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whoop_sync::{
    config::{Config, TokenMode, UpstreamMode},
    db::{deposit_bootstrap_token, CredentialStore, EncryptedFileCredentialStore, InMemoryRecordStore},
    services::{
        MockUpstream, PaginatedFetcher, ResilienceGate, StaticTokenProvider, SyncOrchestrator,
        SyncTrigger, TokenCipher, TokenManager, TokenProvider, UpstreamApi, WhoopClient,
    },
    AppState,
};

/// History generated by the mock upstream.
const MOCK_HISTORY_DAYS: u32 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        port = config.port,
        token_mode = ?config.token_mode,
        upstream_mode = ?config.upstream_mode,
        "Starting WHOOP-Sync"
    );

    // Upstream: real WHOOP or the synthetic generator
    let api: Arc<dyn UpstreamApi> = match config.upstream_mode {
        UpstreamMode::Live => Arc::new(WhoopClient::new(&config.upstream, &config.http)?),
        UpstreamMode::Mock => {
            tracing::warn!(days = MOCK_HISTORY_DAYS, "Using mock upstream data");
            Arc::new(MockUpstream::new(Utc::now(), MOCK_HISTORY_DAYS))
        }
    };

    let tokens = build_token_provider(&config, api.clone()).await?;

    let gate = Arc::new(ResilienceGate::new("whoop", &config.resilience));
    let store = Arc::new(InMemoryRecordStore::new());

    let fetcher = PaginatedFetcher::new(api, tokens, gate.clone(), config.upstream.page_limit);
    let orchestrator = Arc::new(SyncOrchestrator::new(fetcher, store.clone()));
    let trigger = SyncTrigger::new(orchestrator, config.sync.interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = trigger.spawn(config.sync.run_on_startup, shutdown_rx);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        trigger,
        store,
        gate,
    });

    // Build router
    let app = whoop_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Scheduler task ended abnormally");
    }
    Ok(())
}

/// Pick the token source for `TOKEN_MODE`.
async fn build_token_provider(
    config: &Config,
    api: Arc<dyn UpstreamApi>,
) -> anyhow::Result<Arc<dyn TokenProvider>> {
    match config.token_mode {
        TokenMode::Static => {
            let token = config
                .static_access_token
                .clone()
                .or_else(|| {
                    (config.upstream_mode == UpstreamMode::Mock).then(|| "mock-access".to_string())
                })
                .context("STATIC_ACCESS_TOKEN is required when TOKEN_MODE=static")?;
            tracing::info!("Using static access token");
            Ok(Arc::new(StaticTokenProvider::new(token)))
        }
        TokenMode::OAuth => {
            let key = config
                .credentials_key
                .as_deref()
                .context("CREDENTIALS_KEY is required when TOKEN_MODE=oauth")?;
            let cipher = TokenCipher::from_base64_key(key).context("Invalid CREDENTIALS_KEY")?;
            let store: Arc<dyn CredentialStore> = Arc::new(EncryptedFileCredentialStore::new(
                &config.credentials_path,
                cipher,
            ));
            tracing::info!(path = %config.credentials_path, "Credential store initialized");

            deposit_bootstrap_token(store.as_ref(), |name| std::env::var(name).ok()).await?;
            if store.load_token().await?.is_none() {
                tracing::warn!(
                    "No token stored yet; syncs will fail until WHOOP_BOOTSTRAP_* values are supplied"
                );
            }

            Ok(Arc::new(TokenManager::new(store, api)))
        }
    }
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whoop_sync=debug".parse().expect("static directive"))
                .add_directive("info".parse().expect("static directive")),
        )
        .with(format)
        .init();
}
