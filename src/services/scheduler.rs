// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic sync trigger.
//!
//! Runs on its own tokio task so a slow sync never delays other work. At most
//! one run is in flight: a tick or manual trigger that finds a run in progress
//! is skipped. Each run executes on a spawned task, so even a panic inside a
//! sync is caught and logged and the schedule keeps going.

use crate::models::SyncReport;
use crate::services::sync::SyncOrchestrator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct SyncTrigger {
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    running: AtomicBool,
    last_report: RwLock<Option<SyncReport>>,
}

/// Proof of holding the in-flight slot. Released on drop.
pub struct RunGuard {
    trigger: Arc<SyncTrigger>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.trigger.running.store(false, Ordering::SeqCst);
    }
}

impl SyncTrigger {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            interval,
            running: AtomicBool::new(false),
            last_report: RwLock::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Claim the in-flight slot, or `None` if a run is already going.
    pub fn try_claim(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                trigger: Arc::clone(self),
            })
    }

    /// Run one sync unless one is already in flight.
    pub async fn run_once(self: &Arc<Self>) -> Option<SyncReport> {
        match self.try_claim() {
            Some(guard) => self.run_claimed(guard).await,
            None => {
                tracing::warn!("Previous sync still running, skipping this trigger");
                None
            }
        }
    }

    /// Execute a run for an already claimed slot.
    ///
    /// Returns `None` only if the run panicked.
    pub async fn run_claimed(self: &Arc<Self>, guard: RunGuard) -> Option<SyncReport> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.sync_all().await });

        let result = match handle.await {
            Ok(report) => {
                let mut slot = self
                    .last_report
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *slot = Some(report.clone());
                Some(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync run aborted unexpectedly");
                None
            }
        };

        drop(guard);
        result
    }

    /// Start the periodic loop. Stops when `shutdown` flips to `true`.
    pub fn spawn(
        self: &Arc<Self>,
        run_on_startup: bool,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let trigger = Arc::clone(self);

        tokio::spawn(async move {
            let start = if run_on_startup {
                tokio::time::Instant::now()
            } else {
                tokio::time::Instant::now() + trigger.interval
            };
            let mut ticker = tokio::time::interval_at(start, trigger.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                interval_secs = trigger.interval.as_secs(),
                run_on_startup,
                "Sync scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        trigger.run_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Sync scheduler stopped");
        })
    }
}
