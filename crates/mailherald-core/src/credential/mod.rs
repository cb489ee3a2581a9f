//! Gmail credential storage and refresh.

mod manager;
mod model;
mod refresher;
mod repository;

pub use manager::CredentialManager;
pub use model::GmailCredential;
pub use refresher::{OAuthRefresher, TokenRefresher};
pub use repository::CredentialRepository;
