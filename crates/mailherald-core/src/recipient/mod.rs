//! Recipient model, delivery state machine, and storage.

mod model;
mod repository;

pub use model::{Recipient, RecipientCounts, RecipientId, RecipientStatus};
pub use repository::RecipientRepository;
