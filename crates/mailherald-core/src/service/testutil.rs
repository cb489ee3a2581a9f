//! Shared fixtures for engine tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use mailherald_oauth::Token;

use super::Engine;
use crate::blob::MemoryBlobStore;
use crate::campaign::{Campaign, CampaignId};
use crate::credential::{CredentialManager, GmailCredential, TokenRefresher};
use crate::error::{Error, Result};
use crate::recipient::{Recipient, RecipientId};
use crate::store::Store;
use crate::transport::Transport;
use crate::transport::tests::FakeMailer;

/// Refresher that always fails; tests seed non-expiring credentials so
/// it is never exercised.
pub(crate) struct NoopRefresher;

impl TokenRefresher for NoopRefresher {
    async fn refresh(&self, _token: &Token) -> Result<Token> {
        Err(Error::CredentialRefresh("refresh not scripted".to_string()))
    }
}

/// Refresher that always succeeds but hands out tokens already past the
/// expiry buffer, so every freshness check forces another exchange. The
/// shared call count makes refresh timing observable from tests.
pub(crate) struct CountingRefresher {
    calls: Arc<AtomicUsize>,
}

impl CountingRefresher {
    pub(crate) fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, _token: &Token) -> Result<Token> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Token::new(format!("tok{n}"))
            .with_expires_at(Utc::now() - chrono::Duration::seconds(120)))
    }
}

pub(crate) type TestEngine = Engine<FakeMailer, NoopRefresher, MemoryBlobStore>;

/// Builds an engine over an in-memory store seeded with a connected
/// credential for `owner1` and a draft campaign `c1`.
pub(crate) async fn seeded_engine(mailer: FakeMailer) -> TestEngine {
    let store = Store::in_memory().await.unwrap();

    store
        .credentials
        .upsert(&GmailCredential::new("owner1", "sender@gmail.com", "tok"))
        .await
        .unwrap();

    store
        .campaigns
        .insert(&Campaign::new(
            CampaignId::new("c1"),
            "owner1",
            "Hello {{name}}",
            "Hi {{name}}, greetings from {{company}}.",
        ))
        .await
        .unwrap();

    let credentials = CredentialManager::new(store.credentials.clone(), NoopRefresher);
    let transport = Transport::new(mailer, MemoryBlobStore::new());

    Engine::new(store, credentials, transport).with_send_delay(Duration::ZERO)
}

/// A pending recipient in campaign `c1`.
pub(crate) fn pending_recipient(id: &str, email: &str) -> Recipient {
    Recipient::new(RecipientId::new(id), CampaignId::new("c1"), email).unwrap()
}
