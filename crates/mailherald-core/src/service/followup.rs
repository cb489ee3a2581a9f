//! Threaded follow-up dispatch.

use chrono::Utc;
use tracing::{info, warn};

use super::{Engine, FollowUpResult};
use crate::blob::BlobStore;
use crate::campaign::CampaignId;
use crate::credential::TokenRefresher;
use crate::error::{Error, Result};
use crate::log::{EmailLog, EventType};
use crate::mailer::Mailer;
use crate::template::{recipient_variables, render};
use crate::transport::{OutgoingEmail, SendOutcome};

impl<M: Mailer, R: TokenRefresher, B: BlobStore> Engine<M, R, B> {
    /// Sends the follow-up message to every eligible recipient.
    ///
    /// Eligible means sent, unreplied, and no follow-up sent yet; the
    /// scheduler runs the reply sync first so a recipient who replied
    /// moments ago is already out of this set. Each follow-up is
    /// threaded into the original conversation: same thread id,
    /// `In-Reply-To`/`References` pointing at the original message, and
    /// a `Re:` subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist or has no
    /// follow-up template, the owner has no usable credential, or
    /// storage fails.
    pub async fn send_follow_ups(&self, campaign_id: &CampaignId) -> Result<FollowUpResult> {
        let campaign = self
            .store
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| Error::CampaignNotFound(campaign_id.to_string()))?;
        let template = campaign
            .follow_up_template
            .as_deref()
            .ok_or_else(|| Error::MissingFollowUpTemplate(campaign_id.to_string()))?;
        // Precondition check before any send
        self.credentials.fresh(&campaign.owner_id).await?;

        let eligible = self
            .store
            .recipients
            .list_follow_up_eligible(campaign_id)
            .await?;
        if eligible.is_empty() {
            info!(campaign_id = %campaign_id, "no recipients eligible for follow-up");
            return Ok(FollowUpResult::default());
        }

        let mut result = FollowUpResult {
            total_eligible: eligible.len(),
            ..FollowUpResult::default()
        };

        for (i, recipient) in eligible.iter().enumerate() {
            let (Some(message_id), Some(thread_id)) =
                (&recipient.message_id, &recipient.thread_id)
            else {
                warn!(to = %recipient.email, "sent recipient has no thread linkage, skipping");
                result
                    .errors
                    .push(format!("{}: no original message to thread onto", recipient.email));
                continue;
            };

            let variables = recipient_variables(recipient);
            let email = OutgoingEmail::new(
                &recipient.email,
                reply_subject(&render(&campaign.subject_template, &variables)),
                render(template, &variables),
            )
            .in_thread(message_id, thread_id);

            // Re-checked per recipient; the send delay can outlast the
            // token's remaining validity
            let credential = self.credentials.fresh(&campaign.owner_id).await?;

            match self.transport.send(&credential, &email, None).await? {
                SendOutcome::Sent(sent) => {
                    let marked = self
                        .store
                        .recipients
                        .mark_follow_up_sent(&recipient.id, Utc::now())
                        .await?;
                    if marked {
                        self.store
                            .logs
                            .append(
                                &EmailLog::new(
                                    campaign_id.clone(),
                                    recipient.id.clone(),
                                    EventType::FollowUpSent,
                                )
                                .with_message_id(&sent.message_id)
                                .with_thread_id(thread_id),
                            )
                            .await?;
                        result.sent_count += 1;
                        info!(to = %recipient.email, thread_id, "sent follow-up");
                    }
                }
                SendOutcome::Failed(reason) => {
                    warn!(to = %recipient.email, %reason, "follow-up send failed");
                    result.errors.push(format!("{}: {reason}", recipient.email));
                }
            }

            if i + 1 < eligible.len() {
                self.pause_between_sends().await;
            }
        }

        info!(
            campaign_id = %campaign_id,
            sent = result.sent_count,
            eligible = result.total_eligible,
            "follow-up pass finished"
        );

        Ok(result)
    }
}

/// Prefixes a subject with `Re:` unless it already carries one.
fn reply_subject(subject: &str) -> String {
    if subject.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::testutil::{CountingRefresher, TestEngine, pending_recipient, seeded_engine};
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::campaign::Campaign;
    use crate::credential::{CredentialManager, GmailCredential};
    use crate::recipient::{Recipient, RecipientId};
    use crate::store::Store;
    use crate::transport::Transport;
    use crate::transport::tests::FakeMailer;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_reply_subject_prefix() {
        assert_eq!(reply_subject("Hello"), "Re: Hello");
        assert_eq!(reply_subject("Re: Hello"), "Re: Hello");
        assert_eq!(reply_subject("RE: Hello"), "RE: Hello");
        assert_eq!(reply_subject(""), "Re: ");
    }

    /// Seeds campaign `c1` with a follow-up template and one recipient
    /// in the given post-send state.
    async fn engine_with_follow_up(mailer: FakeMailer) -> TestEngine {
        let engine = seeded_engine(mailer).await;
        let campaign = Campaign::new(
            CampaignId::new("cf"),
            "owner1",
            "Hello {{name}}",
            "Hi {{name}}",
        )
        .with_follow_up_template("Just checking in, {{name}}.");
        engine.store.campaigns.insert(&campaign).await.unwrap();
        engine
    }

    async fn seed_sent(engine: &TestEngine, id: &str, email: &str) {
        let mut recipient = pending_recipient(id, email);
        recipient.campaign_id = CampaignId::new("cf");
        engine.store.recipients.insert(&recipient).await.unwrap();
        engine
            .store
            .recipients
            .mark_sent(&RecipientId::new(id), &format!("orig-{id}"), "t1", Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_follow_up_threads_and_flags() {
        // Scenario: one sent, unreplied recipient gets a threaded follow-up
        let engine = engine_with_follow_up(FakeMailer::new()).await;
        seed_sent(&engine, "r1", "a@x.com").await;

        let result = engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();
        assert_eq!(result.sent_count, 1);
        assert_eq!(result.total_eligible, 1);
        assert!(result.errors.is_empty());

        let recipient = engine
            .store
            .recipients
            .get(&RecipientId::new("r1"))
            .await
            .unwrap()
            .unwrap();
        assert!(recipient.follow_up_sent);
        assert!(recipient.follow_up_sent_at.is_some());

        let sent = engine.transport.mailer.sent.lock().unwrap();
        let (raw, thread_id) = &sent[0];
        assert!(raw.contains("Subject: Re: Hello a"));
        assert!(raw.contains("In-Reply-To: <orig-r1>"));
        assert!(raw.contains("References: <orig-r1>"));
        assert_eq!(thread_id.as_deref(), Some("t1"));
        drop(sent);

        let logs = engine
            .store
            .logs
            .list_for_recipient(&RecipientId::new("r1"))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event, EventType::FollowUpSent);
    }

    #[tokio::test]
    async fn test_replied_recipient_not_followed_up() {
        let engine = engine_with_follow_up(FakeMailer::new()).await;
        seed_sent(&engine, "r1", "a@x.com").await;
        seed_sent(&engine, "r2", "b@x.com").await;
        engine
            .store
            .recipients
            .mark_replied(&RecipientId::new("r1"), Utc::now())
            .await
            .unwrap();

        let result = engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();
        assert_eq!(result.total_eligible, 1);
        assert_eq!(result.sent_count, 1);
        assert_eq!(engine.transport.mailer.decoded_sends().len(), 1);
        assert!(engine.transport.mailer.decoded_sends()[0].contains("To: b@x.com"));
    }

    #[tokio::test]
    async fn test_follow_up_sent_only_once() {
        let engine = engine_with_follow_up(FakeMailer::new()).await;
        seed_sent(&engine, "r1", "a@x.com").await;

        engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();
        let second = engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();

        assert_eq!(second.total_eligible, 0);
        assert_eq!(second.sent_count, 0);
        assert_eq!(engine.transport.mailer.decoded_sends().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_follow_up_leaves_flag_unset() {
        let engine = engine_with_follow_up(FakeMailer::rejecting(&["a@x.com"])).await;
        seed_sent(&engine, "r1", "a@x.com").await;

        let result = engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();
        assert_eq!(result.sent_count, 0);
        assert_eq!(result.errors.len(), 1);

        let recipient = engine
            .store
            .recipients
            .get(&RecipientId::new("r1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!recipient.follow_up_sent);
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_before_every_follow_up() {
        let store = Store::in_memory().await.unwrap();
        store
            .credentials
            .upsert(
                &GmailCredential::new("owner1", "sender@gmail.com", "stale")
                    .with_refresh_token("refresh1")
                    .with_expires_at(Utc::now() - chrono::Duration::hours(1)),
            )
            .await
            .unwrap();
        store
            .campaigns
            .insert(
                &Campaign::new(CampaignId::new("cf"), "owner1", "Hello {{name}}", "Hi")
                    .with_follow_up_template("Just checking in."),
            )
            .await
            .unwrap();
        for (id, email) in [("r1", "a@x.com"), ("r2", "b@x.com")] {
            store
                .recipients
                .insert(
                    &Recipient::new(RecipientId::new(id), CampaignId::new("cf"), email).unwrap(),
                )
                .await
                .unwrap();
            store
                .recipients
                .mark_sent(&RecipientId::new(id), &format!("orig-{id}"), "t1", Utc::now())
                .await
                .unwrap();
        }

        let (refresher, calls) = CountingRefresher::new();
        let credentials = CredentialManager::new(store.credentials.clone(), refresher);
        let transport = Transport::new(FakeMailer::new(), MemoryBlobStore::new());
        let engine = Engine::new(store, credentials, transport)
            .with_send_delay(std::time::Duration::ZERO);

        let result = engine.send_follow_ups(&CampaignId::new("cf")).await.unwrap();

        // One exchange for the precondition check plus one per recipient
        assert_eq!(result.sent_count, 2);
        assert!(result.errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_template_is_fatal() {
        // Campaign c1 from the fixture has no follow-up template
        let engine = seeded_engine(FakeMailer::new()).await;
        assert!(matches!(
            engine.send_follow_ups(&CampaignId::new("c1")).await,
            Err(Error::MissingFollowUpTemplate(_))
        ));
    }
}
