//! Credential freshness management.

use std::collections::HashMap;
use std::sync::Arc;

use mailherald_oauth::Token;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::GmailCredential;
use super::refresher::TokenRefresher;
use super::repository::CredentialRepository;
use crate::error::{Error, Result};

/// Hands out Gmail credentials with a valid access token, refreshing
/// on demand.
///
/// A per-owner lock serializes refreshes so concurrent batch operations
/// for the same owner perform at most one token exchange; the loser of
/// the race re-reads the stored credential and finds it already fresh.
#[derive(Debug)]
pub struct CredentialManager<R> {
    repository: CredentialRepository,
    refresher: R,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: TokenRefresher> CredentialManager<R> {
    /// Creates a manager over a credential repository and refresher.
    #[must_use]
    pub fn new(repository: CredentialRepository, refresher: R) -> Self {
        Self {
            repository,
            refresher,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the owner's credential with a non-expired access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialNotFound`] if the owner has no
    /// connected account, or [`Error::CredentialRefresh`] if the token
    /// is expired and cannot be refreshed. Both are fatal for any batch
    /// using this credential.
    pub async fn fresh(&self, owner_id: &str) -> Result<GmailCredential> {
        let credential = self.load(owner_id).await?;
        if !credential.is_expired() {
            return Ok(credential);
        }

        let lock = self.owner_lock(owner_id).await;
        let _guard = lock.lock().await;

        // Another task may have refreshed while we waited on the lock
        let credential = self.load(owner_id).await?;
        if !credential.is_expired() {
            debug!(owner_id, "credential already refreshed");
            return Ok(credential);
        }

        self.refresh_locked(credential).await
    }

    async fn load(&self, owner_id: &str) -> Result<GmailCredential> {
        self.repository
            .get(owner_id)
            .await?
            .ok_or_else(|| Error::CredentialNotFound(owner_id.to_string()))
    }

    async fn owner_lock(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(owner_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn refresh_locked(&self, credential: GmailCredential) -> Result<GmailCredential> {
        let token = Token {
            access_token: credential.access_token.clone(),
            expires_at: credential.token_expires_at,
            refresh_token: credential.refresh_token.clone(),
        };

        let refreshed = self.refresher.refresh(&token).await?;
        self.repository
            .update_token(
                &credential.owner_id,
                &refreshed.access_token,
                refreshed.refresh_token.as_deref(),
                refreshed.expires_at,
            )
            .await?;

        info!(owner_id = %credential.owner_id, "refreshed Gmail access token");

        Ok(GmailCredential {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token.or(credential.refresh_token),
            token_expires_at: refreshed.expires_at,
            ..credential
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Store;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeRefresher {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, _token: &Token) -> Result<Token> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::CredentialRefresh("invalid_grant".to_string()));
            }
            Ok(Token::new("fresh_token")
                .with_expires_at(Utc::now() + Duration::seconds(3600)))
        }
    }

    async fn manager_with(
        credential: Option<GmailCredential>,
        refresher: FakeRefresher,
    ) -> CredentialManager<FakeRefresher> {
        let store = Store::in_memory().await.unwrap();
        if let Some(cred) = credential {
            store.credentials.upsert(&cred).await.unwrap();
        }
        CredentialManager::new(store.credentials, refresher)
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let manager = manager_with(None, FakeRefresher::ok()).await;
        assert!(matches!(
            manager.fresh("owner1").await,
            Err(Error::CredentialNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_valid_credential_skips_refresh() {
        let cred = GmailCredential::new("owner1", "me@gmail.com", "tok1")
            .with_expires_at(Utc::now() + Duration::hours(1));
        let manager = manager_with(Some(cred), FakeRefresher::ok()).await;

        let fresh = manager.fresh("owner1").await.unwrap();
        assert_eq!(fresh.access_token, "tok1");
        assert_eq!(manager.refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_and_persisted() {
        let cred = GmailCredential::new("owner1", "me@gmail.com", "stale")
            .with_refresh_token("refresh1")
            .with_expires_at(Utc::now() - Duration::hours(1));
        let manager = manager_with(Some(cred), FakeRefresher::ok()).await;

        let fresh = manager.fresh("owner1").await.unwrap();
        assert_eq!(fresh.access_token, "fresh_token");
        // Refresh response had no refresh token; the stored one survives
        assert_eq!(fresh.refresh_token.as_deref(), Some("refresh1"));
        assert_eq!(manager.refresher.calls.load(Ordering::SeqCst), 1);

        let stored = manager.repository.get("owner1").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh_token");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh1"));
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces() {
        let cred = GmailCredential::new("owner1", "me@gmail.com", "stale")
            .with_refresh_token("refresh1")
            .with_expires_at(Utc::now() - Duration::hours(1));
        let manager = manager_with(Some(cred), FakeRefresher::failing()).await;

        assert!(matches!(
            manager.fresh("owner1").await,
            Err(Error::CredentialRefresh(_))
        ));
    }
}
