//! The periodic cycle.

use tracing::{debug, info, warn};

use super::{CycleResult, Engine};
use crate::blob::BlobStore;
use crate::campaign::CampaignStatus;
use crate::credential::TokenRefresher;
use crate::error::Result;
use crate::mailer::Mailer;

impl<M: Mailer, R: TokenRefresher, B: BlobStore> Engine<M, R, B> {
    /// Runs one scheduled cycle: dispatch scheduled campaigns, then sync
    /// replies for active campaigns, then send follow-ups.
    ///
    /// Pass order is an invariant. Follow-ups run after the sync so a
    /// recipient whose reply arrived since the last cycle is excluded
    /// before the follow-up pass ever sees them. A campaign failing in
    /// one pass is recorded and does not stop the other campaigns or the
    /// later passes.
    ///
    /// # Errors
    ///
    /// Returns an error only if listing campaigns fails; per-campaign
    /// failures land in the result's error list.
    pub async fn run_scheduled_cycle(&self) -> Result<CycleResult> {
        let mut result = CycleResult::default();

        // Pass 1: dispatch every scheduled campaign as an immediate send
        for campaign in self
            .store
            .campaigns
            .list_by_status(CampaignStatus::Scheduled)
            .await?
        {
            match self
                .dispatch_campaign(&campaign.id, &campaign.owner_id, true)
                .await
            {
                Ok(dispatched) => {
                    result.campaigns_dispatched += 1;
                    result.emails_sent += dispatched.sent_count;
                    result.errors.extend(dispatched.errors);
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.id, error = %e, "scheduled dispatch failed");
                    result.errors.push(format!("dispatch {}: {e}", campaign.id));
                }
            }
        }

        // Pass 2: refresh reply/bounce state for active campaigns
        let active = self.store.campaigns.list_active().await?;
        for campaign in &active {
            match self.sync_campaign(&campaign.id, &campaign.owner_id).await {
                Ok(synced) => {
                    result.replies_found += synced.replied_count;
                    result.bounces_found += synced.bounced_count;
                    result.errors.extend(synced.errors);
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.id, error = %e, "sync failed");
                    result.errors.push(format!("sync {}: {e}", campaign.id));
                }
            }
        }

        // Pass 3: follow-ups, now that reply state is current
        for campaign in &active {
            if campaign.follow_up_template.is_none() {
                debug!(campaign_id = %campaign.id, "no follow-up template, skipping");
                continue;
            }
            match self.send_follow_ups(&campaign.id).await {
                Ok(followed) => {
                    result.follow_ups_sent += followed.sent_count;
                    result.errors.extend(followed.errors);
                }
                Err(e) => {
                    warn!(campaign_id = %campaign.id, error = %e, "follow-up pass failed");
                    result.errors.push(format!("follow-up {}: {e}", campaign.id));
                }
            }
        }

        info!(
            dispatched = result.campaigns_dispatched,
            sent = result.emails_sent,
            replies = result.replies_found,
            bounces = result.bounces_found,
            follow_ups = result.follow_ups_sent,
            errors = result.errors.len(),
            "cycle finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::testutil::{TestEngine, seeded_engine};
    use super::*;
    use crate::campaign::{Campaign, CampaignId};
    use crate::recipient::{Recipient, RecipientId, RecipientStatus};
    use crate::transport::tests::FakeMailer;
    use chrono::Utc;

    async fn insert_campaign(engine: &TestEngine, id: &str, status: CampaignStatus) {
        let campaign = Campaign::new(
            CampaignId::new(id),
            "owner1",
            "Hello {{name}}",
            "Hi {{name}}",
        )
        .with_follow_up_template("Checking in, {{name}}.")
        .with_status(status);
        engine.store.campaigns.insert(&campaign).await.unwrap();
    }

    async fn insert_pending(engine: &TestEngine, campaign: &str, id: &str, email: &str) {
        let recipient =
            Recipient::new(RecipientId::new(id), CampaignId::new(campaign), email).unwrap();
        engine.store.recipients.insert(&recipient).await.unwrap();
    }

    async fn insert_sent(engine: &TestEngine, campaign: &str, id: &str, email: &str, thread: &str) {
        insert_pending(engine, campaign, id, email).await;
        engine
            .store
            .recipients
            .mark_sent(&RecipientId::new(id), &format!("orig-{id}"), thread, Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cycle_runs_all_three_passes_in_order() {
        // Scenario: a scheduled campaign with a pending recipient, and a
        // sent campaign whose recipient replied since the last cycle
        let mailer = FakeMailer::new().with_thread("t9", &["Carol <c@x.com>"]);
        let engine = seeded_engine(mailer).await;
        let sched = Campaign::new(CampaignId::new("sched"), "owner1", "Hello {{name}}", "Hi")
            .with_status(CampaignStatus::Scheduled);
        engine.store.campaigns.insert(&sched).await.unwrap();
        insert_pending(&engine, "sched", "p1", "new@x.com").await;
        insert_campaign(&engine, "active", CampaignStatus::Sent).await;
        insert_sent(&engine, "active", "s1", "c@x.com", "t9").await;

        let result = engine.run_scheduled_cycle().await.unwrap();

        assert_eq!(result.campaigns_dispatched, 1);
        assert_eq!(result.emails_sent, 1);
        assert_eq!(result.replies_found, 1);
        // The reply was discovered in pass 2, so pass 3 must not touch
        // that recipient
        assert_eq!(result.follow_ups_sent, 0);
        assert!(result.errors.is_empty());

        let replied = engine
            .store
            .recipients
            .get(&RecipientId::new("s1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replied.status, RecipientStatus::Replied);
        assert!(!replied.follow_up_sent);

        // Scheduled campaign was dispatched as an immediate send
        let dispatched = engine
            .store
            .campaigns
            .get(&CampaignId::new("sched"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dispatched.status, CampaignStatus::Sent);
    }

    #[tokio::test]
    async fn test_unreplied_recipient_gets_follow_up_in_cycle() {
        let engine = seeded_engine(FakeMailer::new()).await;
        insert_campaign(&engine, "active", CampaignStatus::Sent).await;
        insert_sent(&engine, "active", "s1", "quiet@x.com", "t5").await;

        let result = engine.run_scheduled_cycle().await.unwrap();
        assert_eq!(result.follow_ups_sent, 1);

        let sends = engine.transport.mailer.decoded_sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].contains("Subject: Re: Hello quiet"));
    }

    #[tokio::test]
    async fn test_campaign_without_follow_up_template_is_skipped() {
        // Fixture campaign c1 has no follow-up template
        let engine = seeded_engine(FakeMailer::new()).await;
        engine
            .store
            .campaigns
            .advance_status(&CampaignId::new("c1"), CampaignStatus::Sent)
            .await
            .unwrap();
        insert_sent(&engine, "c1", "s1", "a@x.com", "t5").await;

        let result = engine.run_scheduled_cycle().await.unwrap();
        assert_eq!(result.follow_ups_sent, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_campaign_failure_does_not_halt_cycle() {
        // A scheduled campaign owned by a stranger (no credential) plus
        // a healthy one: the healthy one must still be dispatched
        let engine = seeded_engine(FakeMailer::new()).await;
        let orphan = Campaign::new(CampaignId::new("orphan"), "stranger", "S", "B")
            .with_status(CampaignStatus::Scheduled);
        engine.store.campaigns.insert(&orphan).await.unwrap();
        insert_pending(&engine, "orphan", "o1", "o@x.com").await;

        insert_campaign(&engine, "healthy", CampaignStatus::Scheduled).await;
        insert_pending(&engine, "healthy", "h1", "h@x.com").await;

        let result = engine.run_scheduled_cycle().await.unwrap();
        assert_eq!(result.campaigns_dispatched, 1);
        assert_eq!(result.emails_sent, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("orphan"));
    }

    #[tokio::test]
    async fn test_empty_cycle_is_a_no_op() {
        let engine = seeded_engine(FakeMailer::new()).await;
        let result = engine.run_scheduled_cycle().await.unwrap();
        assert_eq!(result.campaigns_dispatched, 0);
        assert_eq!(result.emails_sent, 0);
        assert_eq!(result.follow_ups_sent, 0);
        assert!(result.errors.is_empty());
    }
}
