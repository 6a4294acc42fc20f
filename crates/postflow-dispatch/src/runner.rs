//! Dispatch runner — one sweep over launched campaigns.
//!
//! Transmission errors are absorbed into failure attempts; a bad campaign
//! never blocks the rest of the batch. Only the initial campaign select can
//! fail the whole sweep (store unavailable), which the loop retries on the
//! next tick.

use chrono::{DateTime, Utc};
use postflow_core::error::{PostflowError, Result};
use postflow_core::traits::{CampaignStore, Mailer};
use postflow_core::types::{AttemptOutcome, Campaign, CampaignStatus, NewAttempt};

use crate::due::is_due;

/// What one dispatch sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Campaigns sent successfully (success attempt recorded).
    pub sent: usize,
    /// Campaigns whose transmission failed (failure attempt recorded).
    pub failed: usize,
    /// Campaigns not yet due this cycle.
    pub skipped: usize,
    /// Campaigns dropped from this cycle by a store error.
    pub errors: usize,
}

/// Run one dispatch pass at `now` over all launched, non-disabled campaigns.
pub async fn run_dispatch(
    store: &dyn CampaignStore,
    mailer: &dyn Mailer,
    now: DateTime<Utc>,
) -> Result<DispatchReport> {
    let campaigns = store.campaigns_by_status(CampaignStatus::Launched)?;
    let mut report = DispatchReport::default();

    for campaign in &campaigns {
        match dispatch_one(store, mailer, campaign, now).await {
            Ok(Some(AttemptOutcome::Success)) => report.sent += 1,
            Ok(Some(AttemptOutcome::Failure)) => report.failed += 1,
            Ok(None) => report.skipped += 1,
            Err(e) => {
                tracing::warn!("⚠️ Campaign {}: {e}", campaign.id);
                report.errors += 1;
            }
        }
    }

    if report.sent + report.failed > 0 {
        tracing::info!(
            "📬 Dispatch sweep: {} sent, {} failed, {} not due",
            report.sent,
            report.failed,
            report.skipped
        );
    }
    Ok(report)
}

/// Evaluate and, when due, send a single campaign. Returns the recorded
/// outcome, or None when the campaign was not due.
async fn dispatch_one(
    store: &dyn CampaignStore,
    mailer: &dyn Mailer,
    campaign: &Campaign,
    now: DateTime<Utc>,
) -> Result<Option<AttemptOutcome>> {
    let last = store.latest_attempt(campaign.id)?;
    if !is_due(campaign, last.as_ref(), now) {
        return Ok(None);
    }

    let message = store.message(campaign.message_id)?.ok_or_else(|| {
        PostflowError::Store(format!(
            "campaign {} references missing message {}",
            campaign.id, campaign.message_id
        ))
    })?;
    let recipients = store.recipient_emails(campaign.id)?;

    match mailer.send(&message.subject, &message.body, &recipients).await {
        Ok(()) => {
            tracing::info!(
                "📨 Campaign {} sent to {} recipient(s)",
                campaign.id,
                recipients.len()
            );
            store.record_attempt(NewAttempt::success(campaign.id, now))?;
            Ok(Some(AttemptOutcome::Success))
        }
        Err(e) => {
            tracing::warn!("⚠️ Campaign {} transmission failed: {e}", campaign.id);
            store.record_attempt(NewAttempt::failure(campaign.id, now, e.to_string()))?;
            Ok(Some(AttemptOutcome::Failure))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::advance_statuses;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use postflow_core::types::Periodicity;
    use postflow_store::SqliteStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mailer fake: scripted per-call outcomes, records every batch it sent.
    struct FakeMailer {
        // None = succeed, Some(detail) = fail with that server response
        script: Mutex<VecDeque<Option<String>>>,
        sent: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeMailer {
        fn always_ok() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn scripted(outcomes: Vec<Option<String>>) -> Self {
            Self {
                script: Mutex::new(outcomes.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn batches(&self) -> Vec<(String, Vec<String>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, subject: &str, _body: &str, recipients: &[String]) -> Result<()> {
            match self.script.lock().unwrap().pop_front().flatten() {
                Some(detail) => Err(PostflowError::Mail(detail)),
                None => {
                    self.sent
                        .lock()
                        .unwrap()
                        .push((subject.to_string(), recipients.to_vec()));
                    Ok(())
                }
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn temp_store(name: &str) -> (SqliteStore, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).ok();
        let store = SqliteStore::open(&dir.join("test.db")).unwrap();
        (store, dir)
    }

    /// Daily campaign, window [t0, t0+10d], one recipient, already launched.
    fn seed_launched(store: &SqliteStore, tag: &str) -> i64 {
        let msg = store
            .add_message(&format!("News {tag}"), "Body", "tester")
            .unwrap();
        let id = store
            .add_campaign(t0(), t0() + Duration::days(10), Periodicity::Daily, msg, "tester")
            .unwrap();
        let client = store
            .add_client(&format!("{tag}@example.com"), tag, None, "tester")
            .unwrap();
        store.add_recipient(id, client).unwrap();
        store.update_status(id, CampaignStatus::Launched).unwrap();
        id
    }

    #[tokio::test]
    async fn test_first_run_sends_and_keeps_launched() {
        // Scenario A
        let (store, dir) = temp_store("postflow-runner-a");
        let id = seed_launched(&store, "a");
        let mailer = FakeMailer::always_ok();

        let report = run_dispatch(&store, &mailer, t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 0);

        let attempts = store.attempts(id).unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Success);
        assert!(attempts[0].response.is_empty());
        assert_eq!(
            store.campaign(id).unwrap().unwrap().status,
            CampaignStatus::Launched
        );
        assert_eq!(mailer.batches()[0].1, vec!["a@example.com".to_string()]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_same_day_rerun_is_skipped() {
        // Scenarios B and C
        let (store, dir) = temp_store("postflow-runner-bc");
        let id = seed_launched(&store, "b");
        let mailer = FakeMailer::always_ok();

        run_dispatch(&store, &mailer, t0() + Duration::hours(1))
            .await
            .unwrap();

        // one hour later, same day: not due
        let report = run_dispatch(&store, &mailer, t0() + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.attempts(id).unwrap().len(), 1);

        // past the daily interval: due again
        let report = run_dispatch(&store, &mailer, t0() + Duration::hours(25))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(store.attempts(id).unwrap().len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_completed_campaign_excluded() {
        // Scenario D
        let (store, dir) = temp_store("postflow-runner-d");
        let id = seed_launched(&store, "d");
        let mailer = FakeMailer::always_ok();

        let after_end = t0() + Duration::days(10) + Duration::seconds(1);
        advance_statuses(&store, after_end).unwrap();
        assert_eq!(
            store.campaign(id).unwrap().unwrap().status,
            CampaignStatus::Completed
        );

        let report = run_dispatch(&store, &mailer, after_end).await.unwrap();
        assert_eq!(report, DispatchReport::default());
        assert!(store.attempts(id).unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failure_recorded_and_batch_continues() {
        // Scenario E
        let (store, dir) = temp_store("postflow-runner-e");
        let first = seed_launched(&store, "e1");
        let second = seed_launched(&store, "e2");
        let mailer =
            FakeMailer::scripted(vec![Some("SMTP send: 554 rejected by relay".into()), None]);

        let report = run_dispatch(&store, &mailer, t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 1);

        let failed = store.attempts(first).unwrap();
        assert_eq!(failed[0].outcome, AttemptOutcome::Failure);
        assert!(failed[0].response.contains("554"));

        let ok = store.attempts(second).unwrap();
        assert_eq!(ok[0].outcome, AttemptOutcome::Success);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_disabled_campaign_never_dispatched() {
        let (store, dir) = temp_store("postflow-runner-disabled");
        let id = seed_launched(&store, "off");
        store.set_disabled(id, true).unwrap();
        let mailer = FakeMailer::always_ok();

        let report = run_dispatch(&store, &mailer, t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(report, DispatchReport::default());
        assert!(store.attempts(id).unwrap().is_empty());
        assert!(mailer.batches().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
