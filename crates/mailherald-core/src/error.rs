//! Error types for the core engine.

use thiserror::Error;

/// Errors that can occur in engine operations.
///
/// Fatal batch-aborting conditions (missing campaign, unusable credential)
/// are variants here; per-recipient failures are collected into batch
/// result error lists instead and never surface as `Err`.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Campaign not found.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    /// No Gmail credential connected for the owner.
    #[error("Gmail account not connected for owner: {0}")]
    CredentialNotFound(String),

    /// Credential refresh failed; the credential is unusable for the
    /// whole batch.
    #[error("Failed to refresh Gmail token: {0}")]
    CredentialRefresh(String),

    /// Campaign has no follow-up template configured.
    #[error("No follow-up template defined for campaign: {0}")]
    MissingFollowUpTemplate(String),

    /// Recipient email address is invalid.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Mail provider transport error.
    #[error("Mail provider error: {0}")]
    Mail(String),

    /// Attachment blob could not be resolved.
    #[error("Blob error: {0}")]
    Blob(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
