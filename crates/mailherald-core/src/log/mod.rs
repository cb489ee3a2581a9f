//! Append-only audit log of mail events.

mod model;
mod repository;

pub use model::{EmailLog, EventType};
pub use repository::LogRepository;
