//! Domain types — the core data model for mailing campaigns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PostflowError;

/// Minimum spacing between successive sends of a campaign.
///
/// Intervals are fixed durations, not calendar-aware: "monthly" is a flat
/// 30 days regardless of month length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Daily,
    Weekly,
    Monthly,
}

impl Periodicity {
    /// The minimum elapsed time before the next send is due.
    pub fn interval(&self) -> Duration {
        match self {
            Periodicity::Daily => Duration::days(1),
            Periodicity::Weekly => Duration::days(7),
            Periodicity::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Periodicity::Daily => "daily",
            Periodicity::Weekly => "weekly",
            Periodicity::Monthly => "monthly",
        }
    }
}

impl FromStr for Periodicity {
    type Err = PostflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Periodicity::Daily),
            "weekly" => Ok(Periodicity::Weekly),
            "monthly" => Ok(Periodicity::Monthly),
            other => Err(PostflowError::InvalidInput(format!(
                "unknown periodicity '{other}' (expected daily|weekly|monthly)"
            ))),
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign lifecycle status. Transitions are one-directional:
/// created → launched → completed. Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Created,
    Launched,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Created => "created",
            CampaignStatus::Launched => "launched",
            CampaignStatus::Completed => "completed",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = PostflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(CampaignStatus::Created),
            "launched" => Ok(CampaignStatus::Launched),
            "completed" => Ok(CampaignStatus::Completed),
            other => Err(PostflowError::InvalidInput(format!(
                "unknown campaign status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured mailing job: time window, periodicity, message, recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    /// Window start — the campaign may not send before this.
    pub start: DateTime<Utc>,
    /// Window end — the campaign completes once now reaches this.
    pub end: DateTime<Utc>,
    pub periodicity: Periodicity,
    pub status: CampaignStatus,
    /// Orthogonal kill switch: a disabled campaign never dispatches and
    /// never transitions, whatever its status or window.
    pub disabled: bool,
    pub owner: String,
    pub message_id: i64,
}

/// The mail content a campaign sends. Intended to be immutable once a
/// campaign references it, so attempt history stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub owner: String,
}

/// A mailing recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    /// Unique across the store.
    pub email: String,
    pub name: String,
    pub comment: Option<String>,
    pub owner: String,
}

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
        }
    }
}

impl FromStr for AttemptOutcome {
    type Err = PostflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AttemptOutcome::Success),
            "failure" => Ok(AttemptOutcome::Failure),
            other => Err(PostflowError::InvalidInput(format!(
                "unknown attempt outcome '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one dispatch evaluation. Append-only; never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub campaign_id: i64,
    pub ts: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    /// Mail server response detail. Empty on success.
    pub response: String,
}

/// An attempt about to be recorded (id assigned by the store).
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub campaign_id: i64,
    pub ts: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub response: String,
}

impl NewAttempt {
    pub fn success(campaign_id: i64, ts: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            ts,
            outcome: AttemptOutcome::Success,
            response: String::new(),
        }
    }

    pub fn failure(campaign_id: i64, ts: DateTime<Utc>, response: impl Into<String>) -> Self {
        Self {
            campaign_id,
            ts,
            outcome: AttemptOutcome::Failure,
            response: response.into(),
        }
    }
}
