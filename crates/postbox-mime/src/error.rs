//! Error types for MIME decoding.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Part number text that is not a dotted list of positive integers.
    #[error("Invalid part number: {0}")]
    InvalidPartNumber(String),

    /// Media type text that is not `type/subtype`.
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),
}
