//! Campaign model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Create a new campaign ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a campaign.
///
/// Status only advances: draft → scheduled → sending → sent. Skipping a
/// stage forward (e.g. an immediate send taking a draft straight to
/// sending) is allowed; moving backwards is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Being edited; not yet queued for sending.
    #[default]
    Draft,
    /// Queued; the scheduler will dispatch it on the next cycle.
    Scheduled,
    /// Dispatch in progress.
    Sending,
    /// Dispatch batch processed (individual sends may still have failed).
    Sent,
}

impl CampaignStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Sent => "sent",
        }
    }

    /// Parses a storage representation, defaulting to draft for
    /// unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "scheduled" => Self::Scheduled,
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            _ => Self::Draft,
        }
    }

    /// Position in the forward-only lifecycle order.
    const fn rank(self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Scheduled => 1,
            Self::Sending => 2,
            Self::Sent => 3,
        }
    }

    /// Returns true if the status may advance to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        self.rank() < next.rank()
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named batch of personalized outbound messages sharing one
/// subject/body/follow-up template.
#[derive(Debug, Clone)]
pub struct Campaign {
    /// Unique identifier.
    pub id: CampaignId,
    /// Owner (the account whose Gmail credential sends this campaign).
    pub owner_id: String,
    /// Subject template with `{{placeholder}}` tokens.
    pub subject_template: String,
    /// Body template with `{{placeholder}}` tokens.
    pub body_template: String,
    /// Optional follow-up body template.
    pub follow_up_template: Option<String>,
    /// Optional attachment blob reference (e.g. a stored resume).
    pub attachment_ref: Option<String>,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// When the dispatch batch completed (immediate sends only).
    pub sent_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Creates a new draft campaign.
    #[must_use]
    pub fn new(
        id: CampaignId,
        owner_id: impl Into<String>,
        subject_template: impl Into<String>,
        body_template: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.into(),
            subject_template: subject_template.into(),
            body_template: body_template.into(),
            follow_up_template: None,
            attachment_ref: None,
            status: CampaignStatus::Draft,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    /// Sets the follow-up template.
    #[must_use]
    pub fn with_follow_up_template(mut self, template: impl Into<String>) -> Self {
        self.follow_up_template = Some(template.into());
        self
    }

    /// Sets the attachment reference.
    #[must_use]
    pub fn with_attachment_ref(mut self, reference: impl Into<String>) -> Self {
        self.attachment_ref = Some(reference.into());
        self
    }

    /// Sets the status (used when loading from storage).
    #[must_use]
    pub const fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = status;
        self
    }
}
