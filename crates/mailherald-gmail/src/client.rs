//! Gmail REST API client.

use crate::error::{Error, Result};
use crate::types::{ApiErrorBody, MessageList, MessageRef, SentMessage, Thread};
use reqwest::{Client, Response};
use serde_json::json;
use url::Url;

/// Default Gmail API base URL.
const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/";

/// Gmail REST API client.
///
/// Operates on the authenticated user's mailbox (`users/me`). Tokens are
/// passed per call so that callers own refresh.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http_client: Client,
    base_url: Url,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Creates a client against the production Gmail API.
    ///
    /// # Panics
    ///
    /// Never panics; the default base URL is statically valid.
    #[must_use]
    #[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap(),
        }
    }

    /// Creates a client against a custom base URL (for testing against a
    /// local stub server).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            http_client: Client::new(),
            base_url: Url::parse(base_url.as_ref())?,
        })
    }

    /// Sends a raw RFC 5322 message, URL-safe Base64 encoded by the caller.
    ///
    /// When `thread_id` is set, the provider appends the message to that
    /// existing conversation instead of starting a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects the send.
    pub async fn send_raw(
        &self,
        access_token: &str,
        encoded_raw: &str,
        thread_id: Option<&str>,
    ) -> Result<SentMessage> {
        let url = self.base_url.join("users/me/messages/send")?;

        let mut body = json!({ "raw": encoded_raw });
        if let Some(thread_id) = thread_id {
            body["threadId"] = json!(thread_id);
        }

        let response = self
            .http_client
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        Ok(checked(response).await?.json().await?)
    }

    /// Fetches a thread's messages with From metadata headers only.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the thread is not found.
    pub async fn get_thread(&self, access_token: &str, thread_id: &str) -> Result<Thread> {
        let mut url = self.base_url.join("users/me/threads/")?.join(thread_id)?;
        url.query_pairs_mut()
            .append_pair("format", "metadata")
            .append_pair("metadataHeaders", "From");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(checked(response).await?.json().await?)
    }

    /// Searches the mailbox with a Gmail query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects the query.
    pub async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let mut url = self.base_url.join("users/me/messages")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string());

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let list: MessageList = checked(response).await?.json().await?;
        Ok(list.messages)
    }
}

/// Surfaces non-2xx responses as API errors with the server's message.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ApiErrorBody>().await {
        Ok(body) => body.error.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}
