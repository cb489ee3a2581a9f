//! # mailherald-oauth
//!
//! `OAuth2` token management for the Gmail API.
//!
//! ## Features
//!
//! - **Token refresh**: exchange a refresh token for a fresh access token,
//!   preserving the refresh token when the server omits it
//! - **Code exchange**: exchange an authorization code from the consent
//!   redirect for an initial token pair
//! - **Expiration checking**: tokens report expiry with a safety buffer
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailherald_oauth::{OAuthClient, Provider, Token};
//!
//! let provider = Provider::google()?;
//! let client = OAuthClient::new("client_id", provider)
//!     .with_client_secret("client_secret");
//!
//! // Refresh before use
//! if token.is_expired() {
//!     token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod provider;
pub mod token;

pub use client::OAuthClient;
pub use error::{Error, Result};
pub use provider::Provider;
pub use token::{Token, TokenResponse};
