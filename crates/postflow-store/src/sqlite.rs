//! SQLite campaign store.
//!
//! One file, no migration tooling: `CREATE TABLE IF NOT EXISTS` on open.
//! Timestamps stored as RFC3339 text, enums as their lowercase names.

use chrono::{DateTime, Utc};
use postflow_core::error::{PostflowError, Result};
use postflow_core::traits::CampaignStore;
use postflow_core::types::{
    Attempt, AttemptOutcome, Campaign, CampaignStatus, Client, Message, NewAttempt, Periodicity,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn =
            Connection::open(path).map_err(|e| PostflowError::Store(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        tracing::debug!("💾 Campaign store opened at {}", path.display());
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                comment TEXT,
                owner TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                owner TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                periodicity TEXT NOT NULL,           -- 'daily', 'weekly', 'monthly'
                status TEXT NOT NULL DEFAULT 'created',
                disabled INTEGER NOT NULL DEFAULT 0,
                owner TEXT NOT NULL DEFAULT '',
                message_id INTEGER NOT NULL REFERENCES messages(id)
            );

            CREATE TABLE IF NOT EXISTS campaign_recipients (
                campaign_id INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
                PRIMARY KEY (campaign_id, client_id)
            );

            -- Append-only; rows are never updated or deleted.
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id INTEGER REFERENCES campaigns(id),
                ts TEXT NOT NULL,
                outcome TEXT NOT NULL,               -- 'success', 'failure'
                response TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_attempts_campaign_ts
                ON attempts (campaign_id, ts DESC);
            ",
        )
        .map_err(|e| PostflowError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PostflowError::Store(e.to_string()))
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let start_str: String = row.get(1)?;
    let end_str: String = row.get(2)?;
    let periodicity_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    Ok(Campaign {
        id: row.get(0)?,
        start: parse_ts(&start_str),
        end: parse_ts(&end_str),
        // Unreadable periodicity falls back to the widest spacing.
        periodicity: periodicity_str.parse().unwrap_or(Periodicity::Monthly),
        // Unreadable status is treated as completed so the row never dispatches.
        status: status_str.parse().unwrap_or(CampaignStatus::Completed),
        disabled: row.get::<_, i64>(5)? != 0,
        owner: row.get(6)?,
        message_id: row.get(7)?,
    })
}

fn row_to_attempt(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attempt> {
    let ts_str: String = row.get(2)?;
    let outcome_str: String = row.get(3)?;
    Ok(Attempt {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        ts: parse_ts(&ts_str),
        outcome: outcome_str.parse().unwrap_or(AttemptOutcome::Failure),
        response: row.get(4)?,
    })
}

const CAMPAIGN_COLS: &str = "id, start_at, end_at, periodicity, status, disabled, owner, message_id";
const ATTEMPT_COLS: &str = "id, campaign_id, ts, outcome, response";

impl CampaignStore for SqliteStore {
    fn add_client(
        &self,
        email: &str,
        name: &str,
        comment: Option<&str>,
        owner: &str,
    ) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO clients (email, name, comment, owner) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![email, name, comment, owner],
        )
        .map_err(|e| PostflowError::Store(format!("Add client: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn clients(&self) -> Result<Vec<Client>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, email, name, comment, owner FROM clients ORDER BY id")
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Client {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    comment: row.get(3)?,
                    owner: row.get(4)?,
                })
            })
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn add_message(&self, subject: &str, body: &str, owner: &str) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (subject, body, owner) VALUES (?1, ?2, ?3)",
            rusqlite::params![subject, body, owner],
        )
        .map_err(|e| PostflowError::Store(format!("Add message: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn message(&self, id: i64) -> Result<Option<Message>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, subject, body, owner FROM messages WHERE id = ?1")
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let result = stmt
            .query_row([id], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    body: row.get(2)?,
                    owner: row.get(3)?,
                })
            })
            .ok();
        Ok(result)
    }

    fn add_campaign(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        periodicity: Periodicity,
        message_id: i64,
        owner: &str,
    ) -> Result<i64> {
        if end <= start {
            return Err(PostflowError::InvalidInput(
                "campaign end must be after start".into(),
            ));
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (start_at, end_at, periodicity, status, disabled, owner, message_id)
             VALUES (?1, ?2, ?3, 'created', 0, ?4, ?5)",
            rusqlite::params![
                start.to_rfc3339(),
                end.to_rfc3339(),
                periodicity.as_str(),
                owner,
                message_id,
            ],
        )
        .map_err(|e| PostflowError::Store(format!("Add campaign: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn add_recipient(&self, campaign_id: i64, client_id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO campaign_recipients (campaign_id, client_id) VALUES (?1, ?2)",
            rusqlite::params![campaign_id, client_id],
        )
        .map_err(|e| PostflowError::Store(format!("Add recipient: {e}")))?;
        Ok(())
    }

    fn campaigns(&self) -> Result<Vec<Campaign>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {CAMPAIGN_COLS} FROM campaigns ORDER BY id"))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], row_to_campaign)
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn campaign(&self, id: i64) -> Result<Option<Campaign>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(stmt.query_row([id], row_to_campaign).ok())
    }

    fn campaigns_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CAMPAIGN_COLS} FROM campaigns WHERE status = ?1 AND disabled = 0 ORDER BY id"
            ))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([status.as_str()], row_to_campaign)
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn open_campaigns(&self) -> Result<Vec<Campaign>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CAMPAIGN_COLS} FROM campaigns
                 WHERE status != 'completed' AND disabled = 0 ORDER BY id"
            ))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], row_to_campaign)
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn update_status(&self, id: i64, status: CampaignStatus) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE campaigns SET status = ?1 WHERE id = ?2",
            rusqlite::params![status.as_str(), id],
        )
        .map_err(|e| PostflowError::Store(format!("Update status: {e}")))?;
        Ok(())
    }

    fn set_disabled(&self, id: i64, disabled: bool) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE campaigns SET disabled = ?1 WHERE id = ?2",
                rusqlite::params![disabled as i64, id],
            )
            .map_err(|e| PostflowError::Store(format!("Set disabled: {e}")))?;
        if changed == 0 {
            return Err(PostflowError::InvalidInput(format!(
                "no campaign with id {id}"
            )));
        }
        Ok(())
    }

    fn recipient_emails(&self, campaign_id: i64) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT c.email FROM clients c
                 JOIN campaign_recipients r ON r.client_id = c.id
                 WHERE r.campaign_id = ?1 ORDER BY c.id",
            )
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([campaign_id], |row| row.get::<_, String>(0))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn latest_attempt(&self, campaign_id: i64) -> Result<Option<Attempt>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ATTEMPT_COLS} FROM attempts
                 WHERE campaign_id = ?1 ORDER BY ts DESC LIMIT 1"
            ))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(stmt.query_row([campaign_id], row_to_attempt).ok())
    }

    fn record_attempt(&self, attempt: NewAttempt) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO attempts (campaign_id, ts, outcome, response) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                attempt.campaign_id,
                attempt.ts.to_rfc3339(),
                attempt.outcome.as_str(),
                attempt.response,
            ],
        )
        .map_err(|e| PostflowError::Store(format!("Record attempt: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn attempts(&self, campaign_id: i64) -> Result<Vec<Attempt>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ATTEMPT_COLS} FROM attempts
                 WHERE campaign_id = ?1 ORDER BY ts DESC"
            ))
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([campaign_id], row_to_attempt)
            .map_err(|e| PostflowError::Store(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
