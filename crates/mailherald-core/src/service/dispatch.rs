//! Campaign dispatch.

use chrono::Utc;
use tracing::{info, warn};

use super::{DispatchResult, Engine};
use crate::blob::BlobStore;
use crate::campaign::{CampaignId, CampaignStatus};
use crate::credential::TokenRefresher;
use crate::error::{Error, Result};
use crate::log::{EmailLog, EventType};
use crate::mailer::Mailer;
use crate::recipient::RecipientStatus;
use crate::template::{recipient_variables, render};
use crate::transport::{OutgoingEmail, SendOutcome};

impl<M: Mailer, R: TokenRefresher, B: BlobStore> Engine<M, R, B> {
    /// Sends the campaign's initial message to every pending recipient.
    ///
    /// Recipients are processed sequentially with the configured delay
    /// between sends. A failed send marks that recipient `failed` and is
    /// recorded in the result's error list; the batch continues. Because
    /// only `pending` recipients are selected, re-invoking after a
    /// partial run resumes instead of re-sending.
    ///
    /// When `immediate` is set the campaign is moved to `sending` before
    /// the loop and to `sent` after it, regardless of individual
    /// failures: campaign status means "batch processed", not "all
    /// succeeded".
    ///
    /// The owner's credential is re-checked before every send, so a
    /// token expiring mid-batch is refreshed transparently instead of
    /// the provider rejecting the remaining messages. A refresh failure
    /// aborts the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist, the owner has no
    /// usable credential, or storage fails.
    pub async fn dispatch_campaign(
        &self,
        campaign_id: &CampaignId,
        owner_id: &str,
        immediate: bool,
    ) -> Result<DispatchResult> {
        let campaign = self
            .store
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| Error::CampaignNotFound(campaign_id.to_string()))?;
        // Precondition check: fail before any status change if the owner
        // has no usable credential
        self.credentials.fresh(owner_id).await?;

        let pending = self
            .store
            .recipients
            .list_by_status(campaign_id, RecipientStatus::Pending)
            .await?;
        if pending.is_empty() {
            info!(campaign_id = %campaign_id, "no pending recipients");
            return Ok(DispatchResult::default());
        }

        // Resolved once and reused across the whole batch
        let attachment = match &campaign.attachment_ref {
            Some(reference) => self.transport.load_attachment(reference).await?,
            None => None,
        };

        if immediate {
            self.store
                .campaigns
                .advance_status(campaign_id, CampaignStatus::Sending)
                .await?;
        }

        let mut result = DispatchResult {
            total_recipients: pending.len(),
            ..DispatchResult::default()
        };

        for (i, recipient) in pending.iter().enumerate() {
            let variables = recipient_variables(recipient);
            let email = OutgoingEmail::new(
                &recipient.email,
                render(&campaign.subject_template, &variables),
                render(&campaign.body_template, &variables),
            );

            // Each send delay eats into the token's remaining validity,
            // so freshness is re-checked per recipient
            let credential = self.credentials.fresh(owner_id).await?;

            match self
                .transport
                .send(&credential, &email, attachment.as_ref())
                .await?
            {
                SendOutcome::Sent(sent) => {
                    let marked = self
                        .store
                        .recipients
                        .mark_sent(&recipient.id, &sent.message_id, &sent.thread_id, Utc::now())
                        .await?;
                    if marked {
                        self.store
                            .logs
                            .append(
                                &EmailLog::new(
                                    campaign_id.clone(),
                                    recipient.id.clone(),
                                    EventType::Sent,
                                )
                                .with_message_id(&sent.message_id)
                                .with_thread_id(&sent.thread_id),
                            )
                            .await?;
                        result.sent_count += 1;
                        info!(
                            campaign_id = %campaign_id,
                            to = %recipient.email,
                            message_id = %sent.message_id,
                            "sent campaign email"
                        );
                    }
                }
                SendOutcome::Failed(reason) => {
                    self.store
                        .recipients
                        .mark_failed(&recipient.id, &reason)
                        .await?;
                    warn!(
                        campaign_id = %campaign_id,
                        to = %recipient.email,
                        %reason,
                        "send failed"
                    );
                    result.errors.push(format!("{}: {reason}", recipient.email));
                }
            }

            if i + 1 < pending.len() {
                self.pause_between_sends().await;
            }
        }

        if immediate {
            self.store
                .campaigns
                .advance_status(campaign_id, CampaignStatus::Sent)
                .await?;
            self.store.campaigns.mark_sent_at(campaign_id, Utc::now()).await?;
        }

        info!(
            campaign_id = %campaign_id,
            sent = result.sent_count,
            total = result.total_recipients,
            failed = result.errors.len(),
            "dispatch finished"
        );

        Ok(result)
    }
}
