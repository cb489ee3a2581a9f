//! Audit log model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::recipient::RecipientId;

/// Kind of mail event recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Initial campaign message sent.
    Sent,
    /// Follow-up message sent.
    FollowUpSent,
    /// A reply from the recipient was detected.
    Replied,
    /// A bounce notification was detected.
    Bounced,
}

impl EventType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::FollowUpSent => "follow_up_sent",
            Self::Replied => "replied",
            Self::Bounced => "bounced",
        }
    }

    /// Parses a storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "follow_up_sent" => Some(Self::FollowUpSent),
            "replied" => Some(Self::Replied),
            "bounced" => Some(Self::Bounced),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable audit-log entry. Entries are appended as events happen
/// and never updated or deleted.
#[derive(Debug, Clone)]
pub struct EmailLog {
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Recipient the event concerns.
    pub recipient_id: RecipientId,
    /// What happened.
    pub event: EventType,
    /// Provider message id, when the event produced or referenced one.
    pub message_id: Option<String>,
    /// Provider thread id, when known.
    pub thread_id: Option<String>,
    /// Free-form detail (e.g. which detection path found a reply).
    pub detail: Option<String>,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl EmailLog {
    /// Creates a log entry timestamped now.
    #[must_use]
    pub fn new(campaign_id: CampaignId, recipient_id: RecipientId, event: EventType) -> Self {
        Self {
            campaign_id,
            recipient_id,
            event,
            message_id: None,
            thread_id: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the provider message id.
    #[must_use]
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the provider thread id.
    #[must_use]
    pub fn with_thread_id(mut self, id: impl Into<String>) -> Self {
        self.thread_id = Some(id.into());
        self
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
