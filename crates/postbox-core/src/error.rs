//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] postbox_imap::Error),

    /// Body part could not be decoded.
    #[error("MIME error: {0}")]
    Mime(#[from] postbox_mime::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error while saving attachments.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Message number zero was passed to an operation that changes state.
    #[error("Invalid message number: {0}")]
    InvalidMessage(u32),
}

impl Error {
    /// IMAP error classification, if this came from the session.
    #[must_use]
    pub fn imap_kind(&self) -> Option<postbox_imap::ErrorKind> {
        match self {
            Self::Imap(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
