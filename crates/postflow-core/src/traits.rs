//! Seams between the dispatcher and the outside world.
//!
//! The dispatcher never touches a database handle or an SMTP transport
//! directly — it is handed a `CampaignStore` and a `Mailer`. Leaf crates
//! provide the real implementations; tests provide fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Attempt, Campaign, CampaignStatus, Client, Message, NewAttempt, Periodicity};

/// Repository surface over campaigns, messages, clients, and attempts.
///
/// Every write is a single atomic unit; no method spans multiple campaigns
/// in one transaction.
pub trait CampaignStore: Send + Sync {
    // ── clients ──────────────────────────────────────────────
    fn add_client(&self, email: &str, name: &str, comment: Option<&str>, owner: &str)
    -> Result<i64>;
    fn clients(&self) -> Result<Vec<Client>>;

    // ── messages ─────────────────────────────────────────────
    fn add_message(&self, subject: &str, body: &str, owner: &str) -> Result<i64>;
    fn message(&self, id: i64) -> Result<Option<Message>>;

    // ── campaigns ────────────────────────────────────────────
    fn add_campaign(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        periodicity: Periodicity,
        message_id: i64,
        owner: &str,
    ) -> Result<i64>;
    fn add_recipient(&self, campaign_id: i64, client_id: i64) -> Result<()>;
    fn campaigns(&self) -> Result<Vec<Campaign>>;
    fn campaign(&self, id: i64) -> Result<Option<Campaign>>;
    /// Campaigns in the given status, excluding disabled ones.
    fn campaigns_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>>;
    /// Non-completed, non-disabled campaigns — the status sweep's working set.
    fn open_campaigns(&self) -> Result<Vec<Campaign>>;
    fn update_status(&self, id: i64, status: CampaignStatus) -> Result<()>;
    fn set_disabled(&self, id: i64, disabled: bool) -> Result<()>;
    /// Recipient email addresses for one campaign.
    fn recipient_emails(&self, campaign_id: i64) -> Result<Vec<String>>;

    // ── attempts ─────────────────────────────────────────────
    /// The single most recent attempt for a campaign, if any.
    fn latest_attempt(&self, campaign_id: i64) -> Result<Option<Attempt>>;
    /// Append an attempt row. Attempts are never mutated afterwards.
    fn record_attempt(&self, attempt: NewAttempt) -> Result<i64>;
    /// Full attempt history for a campaign, newest first.
    fn attempts(&self, campaign_id: i64) -> Result<Vec<Attempt>>;
}

/// Outbound mail transmission.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message to all recipients in a single batch transmission.
    /// Any transport error is returned for the caller to record; the mailer
    /// itself does not retry.
    async fn send(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()>;
}
