//! Error types for the Mca client

use onem2m_resource::CodecError;
use thiserror::Error;

/// Errors that can occur while talking to a CSE
#[derive(Debug, Error)]
pub enum McaError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The CSE answered with a status code other than the expected one
    #[error("Unexpected status {code}: {body}")]
    Status {
        /// HTTP status code returned by the CSE
        code: u16,
        /// Response body, usually a oneM2M debug message
        body: String,
    },

    /// Request or response body could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The configured CSE address is not a usable HTTP URL
    #[error("Invalid CSE address: {0}")]
    InvalidAddress(String),

    /// No originator was configured
    #[error("Missing originator")]
    MissingOriginator,
}
