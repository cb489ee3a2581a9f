//! Campaign storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{Campaign, CampaignId, CampaignStatus};
use crate::Result;

/// Repository for campaign storage and retrieval.
///
/// Campaign rows are created by the CRUD layer; the engine only reads
/// them and advances their status.
#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize database schema.
    pub(crate) async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                subject_template TEXT NOT NULL,
                body_template TEXT NOT NULL,
                follow_up_template TEXT,
                attachment_ref TEXT,
                status TEXT NOT NULL DEFAULT 'draft',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                sent_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a campaign (CRUD-layer affordance, also used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, campaign: &Campaign) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO campaigns
                (id, owner_id, subject_template, body_template, follow_up_template,
                 attachment_ref, status, created_at, updated_at, sent_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&campaign.id.0)
        .bind(&campaign.owner_id)
        .bind(&campaign.subject_template)
        .bind(&campaign.body_template)
        .bind(&campaign.follow_up_template)
        .bind(&campaign.attachment_ref)
        .bind(campaign.status.as_str())
        .bind(campaign.created_at.to_rfc3339())
        .bind(campaign.updated_at.to_rfc3339())
        .bind(campaign.sent_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a campaign by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_campaign))
    }

    /// Lists campaigns with the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT * FROM campaigns WHERE status = ? ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_campaign).collect())
    }

    /// Lists campaigns eligible for reply sync and follow-ups
    /// (status `sent` or `sending`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT * FROM campaigns WHERE status IN ('sent', 'sending') ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_campaign).collect())
    }

    /// Advances a campaign's status, enforcing the forward-only lifecycle.
    ///
    /// Returns false (and changes nothing) if the campaign does not exist
    /// or the transition would move backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn advance_status(&self, id: &CampaignId, status: CampaignStatus) -> Result<bool> {
        let Some(current) = self.get(id).await? else {
            return Ok(false);
        };
        if !current.status.can_advance_to(status) {
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE campaigns SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .bind(current.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamps the campaign's sent timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_sent_at(&self, id: &CampaignId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE campaigns SET sent_at = ?, updated_at = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Maps a database row to a campaign.
fn row_to_campaign(row: &SqliteRow) -> Campaign {
    Campaign {
        id: CampaignId(row.get("id")),
        owner_id: row.get("owner_id"),
        subject_template: row.get("subject_template"),
        body_template: row.get("body_template"),
        follow_up_template: row.get("follow_up_template"),
        attachment_ref: row.get("attachment_ref"),
        status: CampaignStatus::parse(row.get::<String, _>("status").as_str()),
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
        sent_at: row.get::<Option<String>, _>("sent_at").map(parse_timestamp),
    }
}

/// Parses a stored RFC 3339 timestamp, falling back to the epoch for
/// malformed values.
fn parse_timestamp(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Store;

    async fn repo() -> CampaignRepository {
        Store::in_memory().await.unwrap().campaigns
    }

    fn sample(id: &str, status: CampaignStatus) -> Campaign {
        Campaign::new(CampaignId::new(id), "owner1", "Hi {{name}}", "Body").with_status(status)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Draft)).await.unwrap();

        let loaded = repo.get(&CampaignId::new("c1")).await.unwrap().unwrap();
        assert_eq!(loaded.owner_id, "owner1");
        assert_eq!(loaded.subject_template, "Hi {{name}}");
        assert_eq!(loaded.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = repo().await;
        assert!(repo.get(&CampaignId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Scheduled)).await.unwrap();
        repo.insert(&sample("c2", CampaignStatus::Draft)).await.unwrap();
        repo.insert(&sample("c3", CampaignStatus::Scheduled)).await.unwrap();

        let scheduled = repo.list_by_status(CampaignStatus::Scheduled).await.unwrap();
        assert_eq!(scheduled.len(), 2);
    }

    #[tokio::test]
    async fn test_list_active() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Sent)).await.unwrap();
        repo.insert(&sample("c2", CampaignStatus::Sending)).await.unwrap();
        repo.insert(&sample("c3", CampaignStatus::Draft)).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn test_advance_status_forward() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Scheduled)).await.unwrap();

        let id = CampaignId::new("c1");
        assert!(repo.advance_status(&id, CampaignStatus::Sending).await.unwrap());
        assert!(repo.advance_status(&id, CampaignStatus::Sent).await.unwrap());

        let loaded = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CampaignStatus::Sent);
    }

    #[tokio::test]
    async fn test_advance_status_rejects_backwards() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Sent)).await.unwrap();

        let id = CampaignId::new("c1");
        assert!(!repo.advance_status(&id, CampaignStatus::Sending).await.unwrap());

        let loaded = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CampaignStatus::Sent);
    }

    #[tokio::test]
    async fn test_mark_sent_at() {
        let repo = repo().await;
        repo.insert(&sample("c1", CampaignStatus::Sending)).await.unwrap();

        let id = CampaignId::new("c1");
        repo.mark_sent_at(&id, Utc::now()).await.unwrap();

        let loaded = repo.get(&id).await.unwrap().unwrap();
        assert!(loaded.sent_at.is_some());
    }
}
