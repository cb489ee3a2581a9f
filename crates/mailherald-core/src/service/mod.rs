//! Engine operations: dispatch, reply/bounce sync, follow-ups, and the
//! scheduled cycle that sequences them.

mod dispatch;
mod followup;
mod scheduler;
mod sync;

#[cfg(test)]
pub(crate) mod testutil;

use std::time::Duration;

use crate::blob::BlobStore;
use crate::credential::{CredentialManager, TokenRefresher};
use crate::mailer::Mailer;
use crate::store::Store;
use crate::transport::Transport;

/// Fixed pause between provider sends. The sole backpressure against
/// provider rate limits; deliberately not adaptive.
const DEFAULT_SEND_DELAY: Duration = Duration::from_secs(2);

/// The campaign engine.
///
/// One instance serves all campaigns. Recipients within a campaign are
/// processed strictly sequentially, which keeps the audit order simple
/// and respects provider rate limits by construction.
#[derive(Debug)]
pub struct Engine<M, R, B> {
    pub(crate) store: Store,
    pub(crate) credentials: CredentialManager<R>,
    pub(crate) transport: Transport<M, B>,
    pub(crate) send_delay: Duration,
}

impl<M: Mailer, R: TokenRefresher, B: BlobStore> Engine<M, R, B> {
    /// Creates an engine with the default inter-send delay.
    #[must_use]
    pub fn new(
        store: Store,
        credentials: CredentialManager<R>,
        transport: Transport<M, B>,
    ) -> Self {
        Self {
            store,
            credentials,
            transport,
            send_delay: DEFAULT_SEND_DELAY,
        }
    }

    /// Overrides the inter-send delay.
    #[must_use]
    pub const fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub(crate) async fn pause_between_sends(&self) {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
    }
}

/// Outcome of one campaign dispatch batch.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    /// Recipients whose initial send succeeded in this batch.
    pub sent_count: usize,
    /// Recipients attempted in this batch.
    pub total_recipients: usize,
    /// Per-recipient failures, formatted for display.
    pub errors: Vec<String>,
}

/// Outcome of one reply/bounce sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Recipients whose state changed.
    pub updated_count: usize,
    /// Replies detected.
    pub replied_count: usize,
    /// Bounces detected.
    pub bounced_count: usize,
    /// Per-recipient failures, formatted for display.
    pub errors: Vec<String>,
}

/// Outcome of one follow-up dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct FollowUpResult {
    /// Follow-ups sent.
    pub sent_count: usize,
    /// Recipients that were eligible when the pass started.
    pub total_eligible: usize,
    /// Per-recipient failures, formatted for display.
    pub errors: Vec<String>,
}

/// Aggregate outcome of one scheduled cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleResult {
    /// Scheduled campaigns dispatched.
    pub campaigns_dispatched: usize,
    /// Initial sends across all dispatched campaigns.
    pub emails_sent: usize,
    /// Replies detected across all synced campaigns.
    pub replies_found: usize,
    /// Bounces detected across all synced campaigns.
    pub bounces_found: usize,
    /// Follow-ups sent across all campaigns.
    pub follow_ups_sent: usize,
    /// Per-campaign and per-recipient failures, formatted for display.
    pub errors: Vec<String>,
}
