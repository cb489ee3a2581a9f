//! Campaign model and storage.

mod model;
mod repository;

pub use model::{Campaign, CampaignId, CampaignStatus};
pub use repository::CampaignRepository;
