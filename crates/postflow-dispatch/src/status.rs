//! Status transition engine — one-directional campaign lifecycle sweep.

use chrono::{DateTime, Utc};
use postflow_core::error::Result;
use postflow_core::traits::CampaignStore;
use postflow_core::types::{Campaign, CampaignStatus};

/// The transition a campaign should take at `now`, if any.
///
/// Completion wins over launch: a campaign whose whole window already passed
/// goes straight to completed. Disabled campaigns are frozen. No rule ever
/// moves a status backward.
pub fn next_status(campaign: &Campaign, now: DateTime<Utc>) -> Option<CampaignStatus> {
    if campaign.disabled || campaign.status == CampaignStatus::Completed {
        return None;
    }
    if now >= campaign.end {
        return Some(CampaignStatus::Completed);
    }
    if campaign.status == CampaignStatus::Created && now >= campaign.start {
        return Some(CampaignStatus::Launched);
    }
    None
}

/// Sweep all open (non-completed, non-disabled) campaigns and persist the
/// transitions that apply. Campaigns with nothing to change are not written.
/// Returns the number of campaigns updated; a second sweep at the same `now`
/// returns 0.
pub fn advance_statuses(store: &dyn CampaignStore, now: DateTime<Utc>) -> Result<usize> {
    let mut changed = 0;
    for campaign in store.open_campaigns()? {
        if let Some(next) = next_status(&campaign, now) {
            store.update_status(campaign.id, next)?;
            tracing::info!(
                "🔀 Campaign {} status: {} → {}",
                campaign.id,
                campaign.status,
                next
            );
            changed += 1;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use postflow_core::types::Periodicity;
    use postflow_store::SqliteStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn campaign_at(status: CampaignStatus, disabled: bool) -> Campaign {
        Campaign {
            id: 1,
            start: t0(),
            end: t0() + Duration::days(10),
            periodicity: Periodicity::Daily,
            status,
            disabled,
            owner: "tester".into(),
            message_id: 1,
        }
    }

    #[test]
    fn test_created_launches_at_start() {
        let c = campaign_at(CampaignStatus::Created, false);
        assert_eq!(next_status(&c, t0() - Duration::seconds(1)), None);
        assert_eq!(next_status(&c, t0()), Some(CampaignStatus::Launched));
    }

    #[test]
    fn test_completion_wins_over_launch() {
        let c = campaign_at(CampaignStatus::Created, false);
        assert_eq!(
            next_status(&c, c.end + Duration::seconds(1)),
            Some(CampaignStatus::Completed)
        );
    }

    #[test]
    fn test_completed_is_terminal() {
        let c = campaign_at(CampaignStatus::Completed, false);
        assert_eq!(next_status(&c, c.end + Duration::days(100)), None);
    }

    #[test]
    fn test_disabled_is_frozen() {
        let c = campaign_at(CampaignStatus::Created, true);
        assert_eq!(next_status(&c, c.end + Duration::days(1)), None);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let dir = std::env::temp_dir().join("postflow-status-sweep");
        std::fs::create_dir_all(&dir).ok();
        let store = SqliteStore::open(&dir.join("test.db")).unwrap();
        let msg = store.add_message("s", "b", "t").unwrap();
        let id = store
            .add_campaign(t0(), t0() + Duration::days(10), Periodicity::Daily, msg, "t")
            .unwrap();

        let now = t0() + Duration::hours(1);
        assert_eq!(advance_statuses(&store, now).unwrap(), 1);
        assert_eq!(
            store.campaign(id).unwrap().unwrap().status,
            CampaignStatus::Launched
        );
        // same instant again: nothing left to write
        assert_eq!(advance_statuses(&store, now).unwrap(), 0);

        // past the end: completed, then stable forever
        let after_end = t0() + Duration::days(10) + Duration::seconds(1);
        assert_eq!(advance_statuses(&store, after_end).unwrap(), 1);
        assert_eq!(
            store.campaign(id).unwrap().unwrap().status,
            CampaignStatus::Completed
        );
        assert_eq!(advance_statuses(&store, after_end).unwrap(), 0);
        assert_eq!(
            advance_statuses(&store, after_end + Duration::days(30)).unwrap(),
            0
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sweep_skips_disabled() {
        let dir = std::env::temp_dir().join("postflow-status-disabled");
        std::fs::create_dir_all(&dir).ok();
        let store = SqliteStore::open(&dir.join("test.db")).unwrap();
        let msg = store.add_message("s", "b", "t").unwrap();
        let id = store
            .add_campaign(t0(), t0() + Duration::days(10), Periodicity::Daily, msg, "t")
            .unwrap();
        store.set_disabled(id, true).unwrap();

        assert_eq!(advance_statuses(&store, t0() + Duration::days(20)).unwrap(), 0);
        assert_eq!(
            store.campaign(id).unwrap().unwrap().status,
            CampaignStatus::Created
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
