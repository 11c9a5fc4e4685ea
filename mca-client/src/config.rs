//! Connection settings for a CSE

use std::time::Duration;

use onem2m_resource::Encoding;
use url::Url;

use crate::error::McaError;

/// Settings used by [`McaClient`](crate::McaClient) for every request
#[derive(Debug, Clone)]
pub struct McaConfig {
    /// Base URL of the CSE, including scheme, host, port and any API prefix
    pub address: String,
    /// Value of the `X-M2M-Origin` header
    pub originator: String,
    /// Body encoding for requests and the `Accept` header
    /// Default: JSON
    pub encoding: Encoding,
    /// Upper bound for a whole request, connect included
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl McaConfig {
    pub fn new(address: impl Into<String>, originator: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            originator: originator.into(),
            encoding: Encoding::default(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that the address is an HTTP(S) URL and an originator is set
    pub fn validate(&self) -> Result<(), McaError> {
        let url = Url::parse(&self.address)
            .map_err(|e| McaError::InvalidAddress(format!("{}: {}", self.address, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(McaError::InvalidAddress(format!(
                "{}: unsupported scheme {}",
                self.address,
                url.scheme()
            )));
        }
        if self.originator.trim().is_empty() {
            return Err(McaError::MissingOriginator);
        }
        Ok(())
    }
}
