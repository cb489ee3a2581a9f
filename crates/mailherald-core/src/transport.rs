//! Mail transport adapter.
//!
//! Turns a rendered email into an RFC 5322 message (plain text plus a
//! generated HTML alternative), encodes it for the provider, and sends
//! it. Per-message failures become [`SendOutcome::Failed`] so a batch
//! can keep going; only infrastructure failures surface as `Err`.

use mailherald_mime::{Attachment, MessageBuilder, encoding, render_html_body};
use tracing::warn;

use crate::blob::BlobStore;
use crate::credential::GmailCredential;
use crate::error::{Error, Result};
use crate::mailer::{MailMessage, Mailer, SentMail, ThreadMail};

/// A personalized email ready for MIME construction.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Rendered subject.
    pub subject: String,
    /// Rendered plain-text body; the HTML alternative is generated
    /// from it.
    pub text_body: String,
    /// Message id of the original send, for threaded follow-ups.
    pub in_reply_to: Option<String>,
    /// Thread to append to, for threaded follow-ups.
    pub thread_id: Option<String>,
}

impl OutgoingEmail {
    /// Creates an email with just the required fields.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text_body: text_body.into(),
            in_reply_to: None,
            thread_id: None,
        }
    }

    /// Threads the email as a reply to an earlier message.
    #[must_use]
    pub fn in_thread(mut self, message_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(message_id.into());
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The provider accepted the message.
    Sent(SentMail),
    /// The provider rejected this message; the rest of the batch is
    /// unaffected.
    Failed(String),
}

/// Builds, encodes, and sends messages through a [`Mailer`].
#[derive(Debug, Clone)]
pub struct Transport<M, B> {
    pub(crate) mailer: M,
    pub(crate) blobs: B,
}

impl<M: Mailer, B: BlobStore> Transport<M, B> {
    /// Creates a transport over a mailer and blob store.
    #[must_use]
    pub const fn new(mailer: M, blobs: B) -> Self {
        Self { mailer, blobs }
    }

    /// Resolves an attachment reference, once per batch.
    ///
    /// A missing blob is logged and resolves to `None`; the batch goes
    /// out without the attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store itself fails.
    pub async fn load_attachment(&self, reference: &str) -> Result<Option<Attachment>> {
        match self.blobs.fetch(reference).await? {
            Some(blob) => Ok(Some(Attachment::with_guessed_type(blob.filename, blob.data))),
            None => {
                warn!(reference, "attachment blob missing, sending without it");
                Ok(None)
            }
        }
    }

    /// Builds and sends one email with the given credential.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures return `Err`; provider rejections of
    /// this particular message come back as [`SendOutcome::Failed`].
    pub async fn send(
        &self,
        credential: &GmailCredential,
        email: &OutgoingEmail,
        attachment: Option<&Attachment>,
    ) -> Result<SendOutcome> {
        let mut builder = MessageBuilder::new()
            .from(&credential.email)
            .to(&email.to)
            .subject(&email.subject)
            .text_body(&email.text_body)
            .html_body(render_html_body(&email.text_body));

        if let Some(message_id) = &email.in_reply_to {
            builder = builder.in_reply_to(message_id).references(message_id);
        }
        if let Some(attachment) = attachment {
            builder = builder.attach(attachment.clone());
        }

        let raw = match builder.build() {
            Ok(raw) => raw,
            Err(e) => return Ok(SendOutcome::Failed(e.to_string())),
        };

        let message = MailMessage {
            encoded_raw: encoding::encode_base64_url(raw.as_bytes()),
            thread_id: email.thread_id.clone(),
        };

        match self.mailer.send_message(&credential.access_token, &message).await {
            Ok(sent) => Ok(SendOutcome::Sent(sent)),
            Err(Error::Mail(reason)) => Ok(SendOutcome::Failed(reason)),
            Err(e) => Err(e),
        }
    }

    /// Fetches a thread's messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider request fails.
    pub async fn fetch_thread(
        &self,
        credential: &GmailCredential,
        thread_id: &str,
    ) -> Result<Vec<ThreadMail>> {
        self.mailer
            .fetch_thread(&credential.access_token, thread_id)
            .await
    }

    /// Counts mailbox messages matching a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider request fails.
    pub async fn search_messages(
        &self,
        credential: &GmailCredential,
        query: &str,
        max_results: u32,
    ) -> Result<usize> {
        self.mailer
            .search_messages(&credential.access_token, query, max_results)
            .await
    }
}
