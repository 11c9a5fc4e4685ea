//! Error types for the callback server

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while starting the callback server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound, usually because it is in use
    #[error("Failed to bind {addr}: {reason}")]
    Bind {
        /// Address the server tried to bind
        addr: SocketAddr,
        /// Underlying error message
        reason: String,
    },

    /// The listen host did not resolve to any address
    #[error("Cannot resolve listen address {0}")]
    Resolve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let error = ServerError::Bind {
            addr: "127.0.0.1:1400".parse().unwrap(),
            reason: "address in use".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to bind 127.0.0.1:1400: address in use");
        assert_eq!(
            ServerError::Resolve("nowhere:1400".to_string()).to_string(),
            "Cannot resolve listen address nowhere:1400"
        );
    }
}
