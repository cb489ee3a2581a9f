//! Recipient storage and guarded state transitions.
//!
//! Every transition is a single-row `UPDATE` whose `WHERE` clause encodes
//! the state machine guard, so a disallowed transition changes nothing and
//! reports `false` instead of corrupting state. Recipients are independent
//! units of work; no cross-recipient coordination happens here.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{Recipient, RecipientCounts, RecipientId, RecipientStatus};
use crate::Result;
use crate::campaign::CampaignId;

/// Repository for recipient storage and state transitions.
#[derive(Debug, Clone)]
pub struct RecipientRepository {
    pool: SqlitePool,
}

impl RecipientRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize database schema.
    pub(crate) async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipients (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL,
                email TEXT NOT NULL,
                name TEXT,
                company TEXT,
                variables TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL DEFAULT 'pending',
                message_id TEXT,
                thread_id TEXT,
                sent_at TEXT,
                replied_at TEXT,
                follow_up_sent INTEGER NOT NULL DEFAULT 0,
                follow_up_sent_at TEXT,
                error_message TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_recipients_campaign_status
                ON recipients(campaign_id, status)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a recipient (CSV-import affordance, also used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, recipient: &Recipient) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO recipients
                (id, campaign_id, email, name, company, variables, status,
                 message_id, thread_id, sent_at, replied_at,
                 follow_up_sent, follow_up_sent_at, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&recipient.id.0)
        .bind(&recipient.campaign_id.0)
        .bind(&recipient.email)
        .bind(&recipient.name)
        .bind(&recipient.company)
        .bind(serde_json::to_string(&recipient.variables)?)
        .bind(recipient.status.as_str())
        .bind(&recipient.message_id)
        .bind(&recipient.thread_id)
        .bind(recipient.sent_at.map(|t| t.to_rfc3339()))
        .bind(recipient.replied_at.map(|t| t.to_rfc3339()))
        .bind(i32::from(recipient.follow_up_sent))
        .bind(recipient.follow_up_sent_at.map(|t| t.to_rfc3339()))
        .bind(&recipient.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a recipient by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &RecipientId) -> Result<Option<Recipient>> {
        let row = sqlx::query("SELECT * FROM recipients WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_recipient))
    }

    /// Lists a campaign's recipients with the given status, in insertion
    /// order (rowid), which fixes the audit-visible send order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_status(
        &self,
        campaign_id: &CampaignId,
        status: RecipientStatus,
    ) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            "SELECT * FROM recipients WHERE campaign_id = ? AND status = ? ORDER BY rowid ASC",
        )
        .bind(&campaign_id.0)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_recipient).collect())
    }

    /// Lists recipients eligible for a follow-up: sent, unreplied, and
    /// no follow-up sent yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_follow_up_eligible(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM recipients
            WHERE campaign_id = ?
              AND status = 'sent'
              AND replied_at IS NULL
              AND follow_up_sent = 0
            ORDER BY rowid ASC
            ",
        )
        .bind(&campaign_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_recipient).collect())
    }

    /// Transition `pending → sent`, recording the provider message and
    /// thread ids.
    ///
    /// Returns false if the recipient was not pending; the existing
    /// message/thread ids are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_sent(
        &self,
        id: &RecipientId,
        message_id: &str,
        thread_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE recipients
            SET status = 'sent', message_id = ?, thread_id = ?, sent_at = ?,
                error_message = NULL
            WHERE id = ? AND status = 'pending'
            ",
        )
        .bind(message_id)
        .bind(thread_id)
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `pending → failed`, recording the error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_failed(&self, id: &RecipientId, error: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipients SET status = 'failed', error_message = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(error)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `sent → replied`. Idempotent: re-applying on an
    /// already-replied recipient changes nothing and returns false.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_replied(&self, id: &RecipientId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipients SET status = 'replied', replied_at = ? \
             WHERE id = ? AND status = 'sent'",
        )
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `sent → failed` with a bounce annotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_bounced(&self, id: &RecipientId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipients SET status = 'failed', error_message = 'bounced' \
             WHERE id = ? AND status = 'sent'",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the follow-up flag, guarded on `sent ∧ unreplied ∧ not yet
    /// followed up`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_follow_up_sent(&self, id: &RecipientId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE recipients
            SET follow_up_sent = 1, follow_up_sent_at = ?
            WHERE id = ? AND status = 'sent'
              AND replied_at IS NULL AND follow_up_sent = 0
            ",
        )
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `pending → skipped` (CRUD-layer exclusion).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_skipped(&self, id: &RecipientId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipients SET status = 'skipped' WHERE id = ? AND status = 'pending'",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition `failed → pending`, clearing the error so the next
    /// dispatch pass picks the recipient up again.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn requeue(&self, id: &RecipientId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE recipients SET status = 'pending', error_message = NULL \
             WHERE id = ? AND status = 'failed'",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recomputes recipient counts for a campaign from the rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn counts(&self, campaign_id: &CampaignId) -> Result<RecipientCounts> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) as count FROM recipients \
             WHERE campaign_id = ? GROUP BY status",
        )
        .bind(&campaign_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = RecipientCounts::default();
        for row in &rows {
            let status = RecipientStatus::parse(row.get::<String, _>("status").as_str());
            #[allow(clippy::cast_sign_loss)]
            let count = row.get::<i64, _>("count").max(0) as usize;
            counts.total += count;
            match status {
                RecipientStatus::Sent => counts.sent += count,
                RecipientStatus::Replied => {
                    // A replied recipient was necessarily sent first
                    counts.sent += count;
                    counts.replied += count;
                }
                RecipientStatus::Failed => counts.failed += count,
                RecipientStatus::Pending => counts.pending += count,
                RecipientStatus::Skipped => {}
            }
        }

        Ok(counts)
    }
}

/// Maps a database row to a recipient.
fn row_to_recipient(row: &SqliteRow) -> Recipient {
    Recipient {
        id: RecipientId(row.get("id")),
        campaign_id: CampaignId(row.get("campaign_id")),
        email: row.get("email"),
        name: row.get("name"),
        company: row.get("company"),
        variables: serde_json::from_str(row.get::<String, _>("variables").as_str())
            .unwrap_or_default(),
        status: RecipientStatus::parse(row.get::<String, _>("status").as_str()),
        message_id: row.get("message_id"),
        thread_id: row.get("thread_id"),
        sent_at: parse_optional_timestamp(row.get("sent_at")),
        replied_at: parse_optional_timestamp(row.get("replied_at")),
        follow_up_sent: row.get::<i64, _>("follow_up_sent") != 0,
        follow_up_sent_at: parse_optional_timestamp(row.get("follow_up_sent_at")),
        error_message: row.get("error_message"),
    }
}

/// Parses an optional stored RFC 3339 timestamp.
fn parse_optional_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    })
}
