//! Gmail credential storage.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::GmailCredential;
use crate::Result;

/// Repository for connected Gmail credentials, keyed by owner.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
}

impl CredentialRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize database schema.
    pub(crate) async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS gmail_credentials (
                owner_id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                token_expires_at TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces the owner's credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, credential: &GmailCredential) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO gmail_credentials
                (owner_id, email, access_token, refresh_token, token_expires_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET
                email = excluded.email,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&credential.owner_id)
        .bind(&credential.email)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.token_expires_at.map(|t| t.to_rfc3339()))
        .bind(credential.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the owner's credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, owner_id: &str) -> Result<Option<GmailCredential>> {
        let row = sqlx::query("SELECT * FROM gmail_credentials WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_credential))
    }

    /// Persists a refreshed access token, keeping the stored refresh
    /// token when the refresh response omitted one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn update_token(
        &self,
        owner_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE gmail_credentials
            SET access_token = ?,
                refresh_token = COALESCE(?, refresh_token),
                token_expires_at = ?,
                updated_at = ?
            WHERE owner_id = ?
            ",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at.map(|t| t.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes the owner's credential (account disconnect).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, owner_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM gmail_credentials WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Maps a database row to a credential.
fn row_to_credential(row: &SqliteRow) -> GmailCredential {
    GmailCredential {
        owner_id: row.get("owner_id"),
        email: row.get("email"),
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        token_expires_at: row
            .get::<Option<String>, _>("token_expires_at")
            .and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|t| t.with_timezone(&Utc))
            }),
        updated_at: row
            .get::<String, _>("updated_at")
            .parse::<DateTime<Utc>>()
            .unwrap_or_default(),
    }
}
