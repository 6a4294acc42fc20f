//! Dispatcher loop — the periodic trigger.
//!
//! One dedicated loop, sweeps awaited to completion before the next tick:
//! single-instance execution is an in-process invariant here, not a promise
//! made by an external job scheduler. The `busy` flag additionally rejects
//! an overlapping `run_once` from another caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use postflow_core::error::Result;
use postflow_core::traits::{CampaignStore, Mailer};

use crate::runner::{DispatchReport, run_dispatch};
use crate::status::advance_statuses;

pub struct Dispatcher {
    store: Arc<dyn CampaignStore>,
    mailer: Arc<dyn Mailer>,
    busy: AtomicBool,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn CampaignStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            busy: AtomicBool::new(false),
        }
    }

    /// One full sweep at `now`: advance statuses, then dispatch.
    /// Returns None when a sweep is already in flight (the caller's cycle is
    /// simply skipped; the next tick re-evaluates everything).
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<Option<DispatchReport>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::warn!("⏳ Dispatch sweep already running, skipping this cycle");
            return Ok(None);
        }
        let result = self.sweep(now).await;
        self.busy.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        // Canonical ordering: transitions first, then the launched-only pass.
        let transitioned = advance_statuses(self.store.as_ref(), now)?;
        if transitioned > 0 {
            tracing::info!("🔀 {transitioned} campaign status change(s)");
        }
        run_dispatch(self.store.as_ref(), self.mailer.as_ref(), now).await
    }

    /// Run the dispatcher loop forever, sweeping every `tick_secs` seconds.
    /// Store failures are logged and retried on the next tick.
    pub async fn run(&self, tick_secs: u64) {
        tracing::info!("⏰ Dispatcher started (sweep every {tick_secs}s)");
        let mut interval = tokio::time::interval(Duration::from_secs(tick_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.run_once(Utc::now()).await {
                Ok(Some(report)) => {
                    tracing::debug!(
                        "Sweep done: {} sent, {} failed, {} skipped, {} errors",
                        report.sent,
                        report.failed,
                        report.skipped,
                        report.errors
                    );
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("⚠️ Dispatch sweep failed: {e}"),
            }
        }
    }
}
