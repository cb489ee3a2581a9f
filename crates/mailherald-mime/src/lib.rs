//! # mailherald-mime
//!
//! Outgoing MIME message generation for email campaigns.
//!
//! ## Features
//!
//! - **Message building**: RFC 5322 output with `multipart/alternative`
//!   bodies and binary attachments
//! - **Threading headers**: `In-Reply-To` and `References` for replies that
//!   stay in the original conversation
//! - **HTML rendering**: convert a plain-text campaign body into a styled
//!   HTML part (paragraphs and bullet lists)
//! - **Encoding**: Base64, URL-safe Base64 (Gmail `raw` payload),
//!   Quoted-Printable, RFC 2047 header encoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailherald_mime::{MessageBuilder, render_html_body};
//!
//! let body = "Hi there,\n\nA few highlights:\n* fast\n* simple";
//! let raw = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Hello")
//!     .text_body(body)
//!     .html_body(render_html_body(body))
//!     .build()?;
//! ```
//!
//! ### Threaded replies
//!
//! ```ignore
//! let raw = MessageBuilder::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Re: Hello")
//!     .in_reply_to("<abc123@mail.gmail.com>")
//!     .references("<abc123@mail.gmail.com>")
//!     .text_body("Just following up.")
//!     .build()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod error;
mod header;
mod html;

pub mod encoding;

pub use builder::{Attachment, MessageBuilder};
pub use error::{Error, Result};
pub use header::Headers;
pub use html::render_html_body;
