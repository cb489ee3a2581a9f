//! Recipient model types and the delivery state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::campaign::CampaignId;
use crate::error::{Error, Result};

/// Unique identifier for a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientId(pub String);

impl RecipientId {
    /// Create a new recipient ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery state of a recipient within a campaign.
///
/// Valid transitions:
///
/// ```text
/// pending → sent | failed | skipped
/// sent    → replied | failed (bounce) | sent (follow-up flag set)
/// failed  → pending (explicit re-queue only)
/// ```
///
/// `replied` is monotonic and only reachable from `sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    /// Not yet attempted.
    #[default]
    Pending,
    /// Initial send succeeded; message/thread ids recorded.
    Sent,
    /// A reply from the recipient was detected.
    Replied,
    /// Send failed or the message bounced.
    Failed,
    /// Explicitly excluded from sending.
    Skipped,
}

impl RecipientStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Replied => "replied",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a storage representation, defaulting to pending for
    /// unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "sent" => Self::Sent,
            "replied" => Self::Replied,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            _ => Self::Pending,
        }
    }

    /// Returns true if this status may transition to `next`.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Sent | Self::Failed | Self::Skipped)
                | (Self::Sent, Self::Replied | Self::Failed)
                | (Self::Failed, Self::Pending)
        )
    }
}

impl std::fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One target email address within a campaign, with its own
/// delivery/reply state.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Unique identifier.
    pub id: RecipientId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Email address.
    pub email: String,
    /// Recipient name (defaults to the email local part when absent).
    pub name: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Extended template variables beyond name/email/company.
    pub variables: BTreeMap<String, Value>,
    /// Delivery status.
    pub status: RecipientStatus,
    /// Provider message id of the initial send (join key for reply
    /// detection; never overwritten once set).
    pub message_id: Option<String>,
    /// Provider thread id of the initial send.
    pub thread_id: Option<String>,
    /// When the initial send succeeded.
    pub sent_at: Option<DateTime<Utc>>,
    /// When a reply was detected.
    pub replied_at: Option<DateTime<Utc>>,
    /// Whether the follow-up has been sent.
    pub follow_up_sent: bool,
    /// When the follow-up was sent.
    pub follow_up_sent_at: Option<DateTime<Utc>>,
    /// Last error message (send failure or bounce annotation).
    pub error_message: Option<String>,
}

impl Recipient {
    /// Creates a new pending recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the email address does not contain an `@`.
    pub fn new(
        id: RecipientId,
        campaign_id: CampaignId,
        email: impl Into<String>,
    ) -> Result<Self> {
        let email = email.into();
        if !email.contains('@') {
            return Err(Error::InvalidEmail(email));
        }

        Ok(Self {
            id,
            campaign_id,
            email,
            name: None,
            company: None,
            variables: BTreeMap::new(),
            status: RecipientStatus::Pending,
            message_id: None,
            thread_id: None,
            sent_at: None,
            replied_at: None,
            follow_up_sent: false,
            follow_up_sent_at: None,
            error_message: None,
        })
    }

    /// Sets the recipient name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the company.
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Sets an extended template variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Returns the display name: the stored name, or the email local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| {
            self.email
                .split_once('@')
                .map_or(self.email.as_str(), |(local, _)| local)
        })
    }
}

/// Per-campaign recipient counts, recomputed from recipient rows.
///
/// These are never stored on the campaign; the rows are the source
/// of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipientCounts {
    /// Total recipients in the campaign.
    pub total: usize,
    /// Recipients whose initial send succeeded (includes replied).
    pub sent: usize,
    /// Recipients who replied.
    pub replied: usize,
    /// Recipients whose send failed or bounced.
    pub failed: usize,
    /// Recipients not yet attempted.
    pub pending: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn recipient(email: &str) -> Recipient {
        Recipient::new(RecipientId::new("r1"), CampaignId::new("c1"), email).unwrap()
    }

    #[test]
    fn test_email_requires_at_sign() {
        let result = Recipient::new(RecipientId::new("r1"), CampaignId::new("c1"), "not-an-email");
        assert!(matches!(result, Err(Error::InvalidEmail(_))));
    }

    #[test]
    fn test_starts_pending() {
        let r = recipient("a@x.com");
        assert_eq!(r.status, RecipientStatus::Pending);
        assert!(!r.follow_up_sent);
        assert!(r.message_id.is_none());
    }

    #[test]
    fn test_display_name_defaults_to_local_part() {
        assert_eq!(recipient("alice@x.com").display_name(), "alice");
        assert_eq!(
            recipient("alice@x.com").with_name("Alice B").display_name(),
            "Alice B"
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            RecipientStatus::Pending,
            RecipientStatus::Sent,
            RecipientStatus::Replied,
            RecipientStatus::Failed,
            RecipientStatus::Skipped,
        ] {
            assert_eq!(RecipientStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_transition_graph() {
        use RecipientStatus::{Failed, Pending, Replied, Sent, Skipped};

        assert!(Pending.can_become(Sent));
        assert!(Pending.can_become(Failed));
        assert!(Pending.can_become(Skipped));
        assert!(Sent.can_become(Replied));
        assert!(Sent.can_become(Failed)); // bounce
        assert!(Failed.can_become(Pending)); // explicit re-queue

        // Dead ends: replied never from pending/failed, nothing leaves replied
        assert!(!Pending.can_become(Replied));
        assert!(!Failed.can_become(Replied));
        assert!(!Replied.can_become(Sent));
        assert!(!Replied.can_become(Pending));
        assert!(!Skipped.can_become(Sent));
    }
}
