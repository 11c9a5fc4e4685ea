//! Error types for the resource codec

use thiserror::Error;

/// Errors that can occur while encoding or decoding oneM2M resources
#[derive(Debug, Error)]
pub enum CodecError {
    /// The type code is not one of the known resource types
    #[error("Unknown resource type code: {0}")]
    UnknownType(i64),

    /// The type could not be determined from the payload
    #[error("Cannot determine resource type: {0}")]
    MissingType(String),

    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload's root element does not match the expected resource
    #[error("Unexpected root element: expected {expected}, found {found}")]
    WrongRoot {
        /// Short name of the expected resource
        expected: &'static str,
        /// Name actually found in the payload
        found: String,
    },
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
