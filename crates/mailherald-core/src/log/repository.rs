//! Append-only audit log storage.

use chrono::DateTime;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{EmailLog, EventType};
use crate::Result;
use crate::campaign::CampaignId;
use crate::recipient::RecipientId;

/// Repository for the audit log. Append and read only; no updates.
#[derive(Debug, Clone)]
pub struct LogRepository {
    pool: SqlitePool,
}

impl LogRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize database schema.
    pub(crate) async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                event TEXT NOT NULL,
                message_id TEXT,
                thread_id TEXT,
                detail TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_logs_recipient
                ON email_logs(recipient_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn append(&self, entry: &EmailLog) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO email_logs
                (campaign_id, recipient_id, event, message_id, thread_id, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&entry.campaign_id.0)
        .bind(&entry.recipient_id.0)
        .bind(entry.event.as_str())
        .bind(&entry.message_id)
        .bind(&entry.thread_id)
        .bind(&entry.detail)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists a recipient's entries in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_recipient(&self, recipient_id: &RecipientId) -> Result<Vec<EmailLog>> {
        let rows = sqlx::query("SELECT * FROM email_logs WHERE recipient_id = ? ORDER BY id ASC")
            .bind(&recipient_id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(row_to_log).collect())
    }

    /// Lists a campaign's entries in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_campaign(&self, campaign_id: &CampaignId) -> Result<Vec<EmailLog>> {
        let rows = sqlx::query("SELECT * FROM email_logs WHERE campaign_id = ? ORDER BY id ASC")
            .bind(&campaign_id.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(row_to_log).collect())
    }
}

/// Maps a database row to a log entry. Rows with an unknown event kind
/// are skipped rather than misreported.
fn row_to_log(row: &SqliteRow) -> Option<EmailLog> {
    let event = EventType::parse(row.get::<String, _>("event").as_str())?;
    Some(EmailLog {
        campaign_id: CampaignId(row.get("campaign_id")),
        recipient_id: RecipientId(row.get("recipient_id")),
        event,
        message_id: row.get("message_id"),
        thread_id: row.get("thread_id"),
        detail: row.get("detail"),
        created_at: row
            .get::<String, _>("created_at")
            .parse::<DateTime<Utc>>()
            .unwrap_or_default(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Store;

    async fn repo() -> LogRepository {
        Store::in_memory().await.unwrap().logs
    }

    fn entry(recipient: &str, event: EventType) -> EmailLog {
        EmailLog::new(CampaignId::new("c1"), RecipientId::new(recipient), event)
    }

    #[tokio::test]
    async fn test_append_and_list_for_recipient() {
        let repo = repo().await;
        repo.append(&entry("r1", EventType::Sent).with_message_id("m1"))
            .await
            .unwrap();
        repo.append(&entry("r1", EventType::Replied).with_detail("thread scan"))
            .await
            .unwrap();
        repo.append(&entry("r2", EventType::Sent)).await.unwrap();

        let logs = repo.list_for_recipient(&RecipientId::new("r1")).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].event, EventType::Sent);
        assert_eq!(logs[0].message_id.as_deref(), Some("m1"));
        assert_eq!(logs[1].event, EventType::Replied);
    }

    #[tokio::test]
    async fn test_list_for_campaign_preserves_order() {
        let repo = repo().await;
        repo.append(&entry("r1", EventType::Sent)).await.unwrap();
        repo.append(&entry("r2", EventType::Sent)).await.unwrap();
        repo.append(&entry("r2", EventType::Bounced)).await.unwrap();

        let logs = repo.list_for_campaign(&CampaignId::new("c1")).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[2].event, EventType::Bounced);
    }
}
