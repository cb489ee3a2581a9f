//! # mailherald-gmail
//!
//! Minimal Gmail REST API client for campaign dispatch and reply tracking.
//!
//! Covers exactly the three calls the engine needs:
//!
//! - `users.messages.send` — send a raw MIME message, optionally appended
//!   to an existing conversation thread
//! - `users.threads.get` — fetch a thread's From headers (reply detection)
//! - `users.messages.list` — search the mailbox by query (reply fallback
//!   and bounce detection)
//!
//! Bearer tokens are passed per call; token lifecycle is the caller's
//! concern.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailherald_gmail::GmailClient;
//!
//! let client = GmailClient::new();
//! // `encoded` is the URL-safe Base64 encoding of the RFC 5322 message
//! let sent = client.send_raw(&access_token, &encoded, None).await?;
//! println!("message {} in thread {}", sent.id, sent.thread_id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod types;

pub use client::GmailClient;
pub use error::{Error, Result};
pub use types::{MessageRef, SentMessage, Thread, ThreadMessage};
