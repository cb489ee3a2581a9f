//! Reply and bounce detection.

use chrono::Utc;
use tracing::{info, warn};

use super::{Engine, SyncResult};
use crate::blob::BlobStore;
use crate::campaign::CampaignId;
use crate::credential::{GmailCredential, TokenRefresher};
use crate::error::{Error, Result};
use crate::log::{EmailLog, EventType};
use crate::mailer::Mailer;
use crate::recipient::{Recipient, RecipientStatus};

/// Result cap for mailbox searches; existence is all that matters.
const SEARCH_MAX_RESULTS: u32 = 5;

/// Time window for the loose reply search.
const REPLY_SEARCH_WINDOW: &str = "newer_than:30d";

/// How a reply was detected, recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyPath {
    /// Found in the stored conversation thread.
    Thread,
    /// Found by the loose inbox search.
    Search,
}

impl ReplyPath {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Search => "inbox search",
        }
    }
}

impl<M: Mailer, R: TokenRefresher, B: BlobStore> Engine<M, R, B> {
    /// Refreshes reply and bounce state for every `sent` recipient of a
    /// campaign.
    ///
    /// Reply detection prefers the stored conversation thread: a reply
    /// is declared when any thread message's From header contains the
    /// recipient's address (case-insensitive). When no thread id is
    /// stored, or the thread lookup errors, a loose inbox search for
    /// recent mail from the address is used instead. The loose path can
    /// misread unrelated mail from the same address as a reply; that
    /// imprecision is accepted in exchange for catching replies that
    /// escaped the thread.
    ///
    /// Bounce detection runs only for recipients with no reply found.
    /// One recipient's provider error never stops the rest of the pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist, the owner has no
    /// usable credential, or storage fails.
    pub async fn sync_campaign(
        &self,
        campaign_id: &CampaignId,
        owner_id: &str,
    ) -> Result<SyncResult> {
        self.store
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| Error::CampaignNotFound(campaign_id.to_string()))?;
        let credential = self.credentials.fresh(owner_id).await?;

        let sent = self
            .store
            .recipients
            .list_by_status(campaign_id, RecipientStatus::Sent)
            .await?;

        let mut result = SyncResult::default();
        for recipient in &sent {
            match self.sync_recipient(&credential, campaign_id, recipient).await {
                Ok(update) => match update {
                    Some(RecipientUpdate::Replied) => {
                        result.replied_count += 1;
                        result.updated_count += 1;
                    }
                    Some(RecipientUpdate::Bounced) => {
                        result.bounced_count += 1;
                        result.updated_count += 1;
                    }
                    None => {}
                },
                Err(e) => {
                    warn!(to = %recipient.email, error = %e, "sync failed for recipient");
                    result.errors.push(format!("{}: {e}", recipient.email));
                }
            }
        }

        info!(
            campaign_id = %campaign_id,
            replied = result.replied_count,
            bounced = result.bounced_count,
            checked = sent.len(),
            "sync finished"
        );

        Ok(result)
    }

    async fn sync_recipient(
        &self,
        credential: &GmailCredential,
        campaign_id: &CampaignId,
        recipient: &Recipient,
    ) -> Result<Option<RecipientUpdate>> {
        if let Some(path) = self.detect_reply(credential, recipient).await? {
            let marked = self
                .store
                .recipients
                .mark_replied(&recipient.id, Utc::now())
                .await?;
            if marked {
                let mut entry = EmailLog::new(
                    campaign_id.clone(),
                    recipient.id.clone(),
                    EventType::Replied,
                )
                .with_detail(path.as_str());
                if let Some(thread_id) = &recipient.thread_id {
                    entry = entry.with_thread_id(thread_id);
                }
                self.store.logs.append(&entry).await?;
                info!(to = %recipient.email, path = path.as_str(), "reply detected");
                return Ok(Some(RecipientUpdate::Replied));
            }
            return Ok(None);
        }

        if self.detect_bounce(credential, recipient).await? {
            let marked = self.store.recipients.mark_bounced(&recipient.id).await?;
            if marked {
                self.store
                    .logs
                    .append(&EmailLog::new(
                        campaign_id.clone(),
                        recipient.id.clone(),
                        EventType::Bounced,
                    ))
                    .await?;
                info!(to = %recipient.email, "bounce detected");
                return Ok(Some(RecipientUpdate::Bounced));
            }
        }

        Ok(None)
    }

    /// Thread-first reply detection with the loose search fallback.
    ///
    /// A reply found in the thread short-circuits the fallback; a thread
    /// that resolves cleanly but holds no reply also skips it, since the
    /// thread is authoritative for its own conversation.
    async fn detect_reply(
        &self,
        credential: &GmailCredential,
        recipient: &Recipient,
    ) -> Result<Option<ReplyPath>> {
        if let Some(thread_id) = &recipient.thread_id {
            match self.transport.fetch_thread(credential, thread_id).await {
                Ok(messages) => {
                    let found = messages.iter().any(|m| {
                        m.from
                            .as_deref()
                            .is_some_and(|from| contains_address(from, &recipient.email))
                    });
                    return Ok(found.then_some(ReplyPath::Thread));
                }
                Err(e) => {
                    warn!(
                        thread_id,
                        to = %recipient.email,
                        error = %e,
                        "thread lookup failed, falling back to inbox search"
                    );
                }
            }
        }

        let query = format!("from:{} {REPLY_SEARCH_WINDOW}", recipient.email);
        let hits = self
            .transport
            .search_messages(credential, &query, SEARCH_MAX_RESULTS)
            .await?;
        Ok((hits > 0).then_some(ReplyPath::Search))
    }

    async fn detect_bounce(
        &self,
        credential: &GmailCredential,
        recipient: &Recipient,
    ) -> Result<bool> {
        let query = format!(
            "from:mailer-daemon \"Delivery Status Notification\" {}",
            recipient.email
        );
        let hits = self
            .transport
            .search_messages(credential, &query, SEARCH_MAX_RESULTS)
            .await?;
        Ok(hits > 0)
    }
}

enum RecipientUpdate {
    Replied,
    Bounced,
}

/// Case-insensitive address match inside a From header like
/// `Alice <a@x.com>`.
fn contains_address(from: &str, email: &str) -> bool {
    from.to_lowercase().contains(&email.to_lowercase())
}
