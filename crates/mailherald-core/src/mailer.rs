//! Mail provider seam.

use mailherald_gmail::GmailClient;

use crate::error::{Error, Result};

/// An encoded outbound message, ready for the provider.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// URL-safe Base64 encoded RFC 5322 message.
    pub encoded_raw: String,
    /// Existing conversation to append to, for threaded follow-ups.
    pub thread_id: Option<String>,
}

/// Provider identifiers of a sent message.
#[derive(Debug, Clone)]
pub struct SentMail {
    /// Provider message id.
    pub message_id: String,
    /// Provider thread id.
    pub thread_id: String,
}

/// One message in a conversation thread, reduced to what reply
/// detection needs.
#[derive(Debug, Clone)]
pub struct ThreadMail {
    /// Provider message id.
    pub message_id: String,
    /// From header value, when the provider returned one.
    pub from: Option<String>,
}

/// Mail provider operations the engine depends on.
///
/// Tests substitute an in-memory fake; production wires the Gmail
/// client.
pub trait Mailer {
    /// Sends an encoded message, optionally into an existing thread.
    fn send_message(
        &self,
        access_token: &str,
        message: &MailMessage,
    ) -> impl Future<Output = Result<SentMail>> + Send;

    /// Fetches a thread's messages. A vanished thread reads as empty.
    fn fetch_thread(
        &self,
        access_token: &str,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMail>>> + Send;

    /// Counts messages matching a mailbox query, capped at `max_results`.
    fn search_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = Result<usize>> + Send;
}

impl Mailer for GmailClient {
    async fn send_message(&self, access_token: &str, message: &MailMessage) -> Result<SentMail> {
        let sent = self
            .send_raw(access_token, &message.encoded_raw, message.thread_id.as_deref())
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;

        Ok(SentMail {
            message_id: sent.id,
            thread_id: sent.thread_id,
        })
    }

    async fn fetch_thread(&self, access_token: &str, thread_id: &str) -> Result<Vec<ThreadMail>> {
        match self.get_thread(access_token, thread_id).await {
            Ok(thread) => Ok(thread
                .messages
                .into_iter()
                .map(|m| ThreadMail {
                    from: m.from_header().map(ToString::to_string),
                    message_id: m.id,
                })
                .collect()),
            // A deleted thread is not a sync failure
            Err(mailherald_gmail::Error::Api { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(Error::Mail(e.to_string())),
        }
    }

    async fn search_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<usize> {
        let refs = self
            .list_messages(access_token, query, max_results)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(refs.len())
    }
}
