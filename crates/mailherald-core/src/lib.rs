//! # mailherald-core
//!
//! Campaign dispatch and reply-tracking engine.
//!
//! This crate provides:
//! - Campaign, recipient, and audit-log models with `SQLite` storage
//! - The recipient delivery state machine (pending → sent → replied, with
//!   failure and follow-up transitions)
//! - Template rendering for personalized subjects and bodies
//! - A mail transport adapter that builds MIME messages, plus a credential
//!   manager that keeps Gmail tokens fresh across sends
//! - The four engine operations: campaign dispatch, reply/bounce sync,
//!   follow-up dispatch, and the scheduled cycle that sequences them

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod blob;
pub mod campaign;
pub mod credential;
mod error;
pub mod log;
pub mod mailer;
pub mod recipient;
mod store;
pub mod template;
pub mod transport;

pub mod service;

pub use blob::{Blob, BlobStore, FsBlobStore, MemoryBlobStore};
pub use campaign::{Campaign, CampaignId, CampaignRepository, CampaignStatus};
pub use credential::{
    CredentialManager, CredentialRepository, GmailCredential, OAuthRefresher, TokenRefresher,
};
pub use error::{Error, Result};
pub use log::{EmailLog, EventType, LogRepository};
pub use mailer::{MailMessage, Mailer, SentMail, ThreadMail};
pub use recipient::{Recipient, RecipientCounts, RecipientId, RecipientRepository, RecipientStatus};
pub use service::{CycleResult, DispatchResult, Engine, FollowUpResult, SyncResult};
pub use store::Store;
pub use template::{extract_variables, recipient_variables, render, validate_template};
pub use transport::{OutgoingEmail, SendOutcome, Transport};
