//! Outgoing message construction.

use crate::encoding::{encode_base64, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Maximum line length for Base64-encoded attachment bodies.
const BASE64_LINE_LENGTH: usize = 76;

/// A binary attachment for an outgoing message.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// Raw file content.
    pub content: Vec<u8>,
    /// MIME content type (e.g. `application/pdf`).
    pub content_type: String,
}

impl Attachment {
    /// Creates a new attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content,
            content_type: content_type.into(),
        }
    }

    /// Creates an attachment, guessing the content type from the
    /// filename extension.
    #[must_use]
    pub fn with_guessed_type(filename: impl Into<String>, content: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            filename,
            content,
            content_type,
        }
    }
}

/// Guesses a MIME content type from a filename extension.
#[must_use]
pub fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Builder for RFC 5322 outgoing messages.
///
/// Produces `multipart/alternative` output when both text and HTML bodies
/// are set, wrapped in `multipart/mixed` when attachments are present.
/// Threading headers (`In-Reply-To`, `References`) make the message appear
/// as a reply in the original conversation.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Option<String>,
    subject: Option<String>,
    reply_to: Option<String>,
    in_reply_to: Option<String>,
    references: Option<String>,
    text_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Creates a new empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Sets the In-Reply-To header (message id of the original message).
    #[must_use]
    pub fn in_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(message_id.into());
        self
    }

    /// Sets the References header.
    #[must_use]
    pub fn references(mut self, references: impl Into<String>) -> Self {
        self.references = Some(references.into());
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if From, To, or Subject is missing, or if neither
    /// a text nor an HTML body is set.
    pub fn build(self) -> Result<String> {
        let from = self
            .from
            .ok_or_else(|| Error::MissingHeader("From".to_string()))?;
        let to = self
            .to
            .ok_or_else(|| Error::MissingHeader("To".to_string()))?;
        let subject = self
            .subject
            .ok_or_else(|| Error::MissingHeader("Subject".to_string()))?;

        if self.text_body.is_none() && self.html_body.is_none() {
            return Err(Error::MissingBody);
        }

        let mut headers = Headers::new();
        headers.set("From", &from);
        headers.set("To", &to);
        headers.set_encoded("Subject", &subject);
        if let Some(reply_to) = &self.reply_to {
            headers.set("Reply-To", reply_to);
        }
        if let Some(in_reply_to) = &self.in_reply_to {
            headers.set("In-Reply-To", bracketed(in_reply_to));
        }
        if let Some(references) = &self.references {
            headers.set("References", bracketed(references));
        }
        headers.set("MIME-Version", "1.0");

        let body = body_section(
            self.text_body.as_deref(),
            self.html_body.as_deref(),
            &self.attachments,
            &mut headers,
        );

        Ok(format!("{headers}\r\n{body}"))
    }
}

/// Wraps a message id in angle brackets if not already bracketed.
fn bracketed(message_id: &str) -> String {
    if message_id.starts_with('<') {
        message_id.to_string()
    } else {
        format!("<{message_id}>")
    }
}

/// Renders the body, setting the top-level Content-Type header.
fn body_section(
    text: Option<&str>,
    html: Option<&str>,
    attachments: &[Attachment],
    headers: &mut Headers,
) -> String {
    let alternative = alternative_section(text, html);

    if attachments.is_empty() {
        headers.set("Content-Type", alternative.content_type);
        return alternative.body;
    }

    let boundary = make_boundary("mixed", alternative.body.len());
    headers.set(
        "Content-Type",
        format!("multipart/mixed; boundary=\"{boundary}\""),
    );

    let mut out = String::new();
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str(&format!(
        "Content-Type: {}\r\n\r\n",
        alternative.content_type
    ));
    out.push_str(&alternative.body);
    out.push_str("\r\n");

    for attachment in attachments {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.content_type, attachment.filename
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            attachment.filename
        ));
        out.push_str(&wrap_base64(&encode_base64(&attachment.content)));
        out.push_str("\r\n");
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

/// A rendered body with its content type.
struct BodySection {
    content_type: String,
    body: String,
}

/// Renders the text/html alternative section (or a single part).
fn alternative_section(text: Option<&str>, html: Option<&str>) -> BodySection {
    match (text, html) {
        (Some(text), Some(html)) => {
            let boundary = make_boundary("alt", text.len() + html.len());
            let mut body = String::new();
            body.push_str(&format!("--{boundary}\r\n"));
            body.push_str(&part("text/plain", text));
            body.push_str(&format!("--{boundary}\r\n"));
            body.push_str(&part("text/html", html));
            body.push_str(&format!("--{boundary}--\r\n"));
            BodySection {
                content_type: format!("multipart/alternative; boundary=\"{boundary}\""),
                body,
            }
        }
        (Some(text), None) => BodySection {
            content_type: "text/plain; charset=utf-8".to_string(),
            body: render_single(text),
        },
        (None, Some(html)) => BodySection {
            content_type: "text/html; charset=utf-8".to_string(),
            body: render_single(html),
        },
        // Guarded by build()
        (None, None) => BodySection {
            content_type: "text/plain; charset=utf-8".to_string(),
            body: String::new(),
        },
    }
}

/// Renders one inline body part with headers.
fn part(content_type: &str, content: &str) -> String {
    format!(
        "Content-Type: {content_type}; charset=utf-8\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\r\n\
         {}\r\n",
        encode_qp_body(content)
    )
}

/// Renders a single-part body (no nested headers).
fn render_single(content: &str) -> String {
    format!("{}\r\n", encode_qp_body(content))
}

/// Quoted-printable encodes a body, preserving line structure.
fn encode_qp_body(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    normalized
        .split('\n')
        .map(encode_quoted_printable)
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Derives a boundary string unique within one message.
fn make_boundary(label: &str, seed: usize) -> String {
    format!("=_mailherald_{label}_{seed:x}")
}

/// Wraps Base64 output at the standard line length.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_LENGTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}
