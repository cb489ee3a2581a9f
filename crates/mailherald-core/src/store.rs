//! Shared `SQLite` store.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::Result;
use crate::campaign::CampaignRepository;
use crate::credential::CredentialRepository;
use crate::log::LogRepository;
use crate::recipient::RecipientRepository;

/// All repositories over one shared connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    /// Campaign storage.
    pub campaigns: CampaignRepository,
    /// Recipient storage and state transitions.
    pub recipients: RecipientRepository,
    /// Append-only audit log.
    pub logs: LogRepository,
    /// Connected Gmail credentials.
    pub credentials: CredentialRepository,
}

impl Store {
    /// Opens (creating if missing) the database at `path` and
    /// initializes all schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or a schema
    /// statement fails.
    pub async fn connect(path: &Path) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
                .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        debug!(path = %path.display(), "opened database");
        Self::from_pool(pool).await
    }

    /// Creates an in-memory store (tests).
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every repository on the same
        // in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self {
            campaigns: CampaignRepository::new(pool.clone()),
            recipients: RecipientRepository::new(pool.clone()),
            logs: LogRepository::new(pool.clone()),
            credentials: CredentialRepository::new(pool),
        };

        store.campaigns.initialize().await?;
        store.recipients.initialize().await?;
        store.logs.initialize().await?;
        store.credentials.initialize().await?;

        Ok(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_initializes_all_schemas() {
        let store = Store::in_memory().await.unwrap();
        assert!(store.credentials.get("nobody").await.unwrap().is_none());
        assert!(
            store
                .campaigns
                .get(&crate::CampaignId::new("nope"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
