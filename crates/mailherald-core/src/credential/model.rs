//! Gmail credential model.

use chrono::{DateTime, Duration, Utc};

/// Seconds before actual expiry at which a token is treated as expired.
///
/// Matches the refresh buffer used by the `OAuth2` layer so a send that
/// starts just before expiry never goes out with a stale token.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// A connected Gmail account: the address mail is sent from plus its
/// `OAuth2` tokens. One credential per owner.
#[derive(Debug, Clone)]
pub struct GmailCredential {
    /// Owner this credential belongs to.
    pub owner_id: String,
    /// Gmail address used as the From header.
    pub email: String,
    /// Current access token.
    pub access_token: String,
    /// Refresh token for renewing the access token.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// When the credential was last updated.
    pub updated_at: DateTime<Utc>,
}

impl GmailCredential {
    /// Creates a credential.
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        email: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            email: email.into(),
            access_token: access_token.into(),
            refresh_token: None,
            token_expires_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Sets the access token expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.token_expires_at = Some(at);
        self
    }

    /// Checks if the access token is expired (with a 60 second buffer).
    ///
    /// Credentials without a recorded expiry are treated as valid.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.token_expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= exp)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expiry_is_valid() {
        let cred = GmailCredential::new("owner1", "me@gmail.com", "tok");
        assert!(!cred.is_expired());
    }

    #[test]
    fn test_expiry_buffer() {
        let soon = GmailCredential::new("owner1", "me@gmail.com", "tok")
            .with_expires_at(Utc::now() + Duration::seconds(30));
        assert!(soon.is_expired());

        let valid = GmailCredential::new("owner1", "me@gmail.com", "tok")
            .with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
    }
}
