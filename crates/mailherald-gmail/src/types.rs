//! Gmail API response types.
//!
//! Only the fields the engine reads are deserialized; everything else in
//! the API responses is ignored.

use serde::Deserialize;

/// Result of sending a message.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    /// Provider message identifier.
    pub id: String,
    /// Provider thread identifier the message landed in.
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// Reference to a message found by search.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    /// Provider message identifier.
    pub id: String,
    /// Provider thread identifier.
    #[serde(rename = "threadId", default)]
    pub thread_id: Option<String>,
}

/// A conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    /// Thread identifier.
    pub id: String,
    /// Messages in the thread.
    #[serde(default)]
    pub messages: Vec<ThreadMessage>,
}

/// One message in a thread, with metadata headers.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    /// Message identifier.
    pub id: String,
    /// Message payload (headers only when fetched with metadata format).
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl ThreadMessage {
    /// Returns the From header value, if present.
    #[must_use]
    pub fn from_header(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| {
            p.headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case("from"))
                .map(|h| h.value.as_str())
        })
    }
}

/// Message payload (metadata format).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Payload {
    /// Metadata headers.
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// A single message header.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Response body for `users.messages.list`.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

/// Error body returned by the Gmail API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

/// Error detail inside an API error body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
