//! Token refresh seam.

use mailherald_oauth::{OAuthClient, Token};

use crate::error::{Error, Result};

/// Refreshes an expired `OAuth2` access token.
///
/// The engine only ever refreshes; the interactive consent flow lives in
/// the account-connection surface, not here. Tests substitute a fake.
pub trait TokenRefresher {
    /// Exchanges the token's refresh token for a new access token.
    fn refresh(&self, token: &Token) -> impl Future<Output = Result<Token>> + Send;
}

/// [`TokenRefresher`] backed by the Google `OAuth2` token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthRefresher {
    client: OAuthClient,
}

impl OAuthRefresher {
    /// Creates a refresher over an `OAuth2` client.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }
}

impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, token: &Token) -> Result<Token> {
        self.client
            .refresh_token(token)
            .await
            .map_err(|e| Error::CredentialRefresh(e.to_string()))
    }
}
