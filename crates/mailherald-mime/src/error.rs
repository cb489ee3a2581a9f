//! Error types for MIME generation.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing required header.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// Message has no body part.
    #[error("Message has no text or HTML body")]
    MissingBody,

    /// Invalid header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Invalid attachment.
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
}
