//! Due-time evaluation — pure, no store access.

use chrono::{DateTime, Utc};
use postflow_core::types::{Attempt, Campaign};

/// Is this campaign due to send right now?
///
/// - Past its end (or disabled) → never due.
/// - No prior attempt → due once the window has opened (first send).
/// - Prior attempt → due when the elapsed time since it reaches the
///   periodicity interval. Exactly the interval counts as due.
pub fn is_due(campaign: &Campaign, last_attempt: Option<&Attempt>, now: DateTime<Utc>) -> bool {
    if campaign.disabled || now >= campaign.end {
        return false;
    }
    match last_attempt {
        None => now >= campaign.start,
        Some(attempt) => now - attempt.ts >= campaign.periodicity.interval(),
    }
}
