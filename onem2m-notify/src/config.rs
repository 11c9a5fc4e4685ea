//! Notification service configuration

use std::time::Duration;

use onem2m_resource::NotificationContentType;
use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, Result};

/// Environment variable overriding the listen host
pub const HOST_ENV: &str = "ONEM2M_NOTIFY_HOST";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "ONEM2M_NOTIFY_PORT";

/// Configuration for [`NotificationService`](crate::NotificationService)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Interface the listener binds to, also used in the notification URI
    /// Default: "localhost"
    pub host: Option<String>,

    /// Port the listener binds to; 0 picks a free port
    /// Default: 1400
    pub port: Option<u16>,

    /// What the CSE puts into each notification (`nct`)
    /// Default: all attributes
    pub notification_content_type: NotificationContentType,

    /// Number of notifications after which the CSE deletes the subscription (`exc`)
    /// Default: None (unbounded)
    pub expiration_counter: Option<i64>,

    /// How long shutdown waits for in-flight callbacks
    /// Default: 5 seconds
    pub dispatch_drain_timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            host: Some("localhost".to_string()),
            port: Some(1400),
            notification_content_type: NotificationContentType::AllAttributes,
            expiration_counter: None,
            dispatch_drain_timeout: Duration::from_secs(5),
        }
    }
}

impl NotificationConfig {
    /// Default configuration listening on `host:port`
    pub fn with_listen_address(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    /// Default configuration with host and port taken from
    /// `ONEM2M_NOTIFY_HOST` and `ONEM2M_NOTIFY_PORT` when set
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(host) = std::env::var(HOST_ENV) {
            config.host = Some(host);
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            let port = port.trim().parse::<u16>().map_err(|e| {
                NotificationError::Configuration(format!("{}={}: {}", PORT_ENV, port, e))
            })?;
            config.port = Some(port);
        }
        Ok(config)
    }

    pub fn with_expiration_counter(mut self, count: i64) -> Self {
        self.expiration_counter = Some(count);
        self
    }

    pub fn with_notification_content_type(mut self, nct: NotificationContentType) -> Self {
        self.notification_content_type = nct;
        self
    }

    pub fn with_dispatch_drain_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_drain_timeout = timeout;
        self
    }

    /// The host and port to listen on, or a configuration error
    pub fn listen_address(&self) -> Result<(&str, u16)> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| NotificationError::Configuration("missing host".to_string()))?;
        let port = self
            .port
            .ok_or_else(|| NotificationError::Configuration("missing port".to_string()))?;
        Ok((host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NotificationConfig::default();
        assert_eq!(config.listen_address().unwrap(), ("localhost", 1400));
        assert_eq!(config.notification_content_type, NotificationContentType::AllAttributes);
        assert_eq!(config.dispatch_drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_host_or_port() {
        let mut config = NotificationConfig::default();
        config.host = Some("  ".to_string());
        assert!(matches!(
            config.listen_address(),
            Err(NotificationError::Configuration(_))
        ));

        let mut config = NotificationConfig::default();
        config.port = None;
        assert!(matches!(
            config.listen_address(),
            Err(NotificationError::Configuration(_))
        ));
    }

    #[test]
    fn test_port_zero_is_valid() {
        let config = NotificationConfig::with_listen_address("127.0.0.1", 0);
        assert_eq!(config.listen_address().unwrap(), ("127.0.0.1", 0));
    }

    #[test]
    fn test_builders() {
        let config = NotificationConfig::with_listen_address("0.0.0.0", 9000)
            .with_expiration_counter(3)
            .with_notification_content_type(NotificationContentType::ResourceId)
            .with_dispatch_drain_timeout(Duration::from_millis(250));
        assert_eq!(config.expiration_counter, Some(3));
        assert_eq!(config.notification_content_type, NotificationContentType::ResourceId);
        assert_eq!(config.dispatch_drain_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var(HOST_ENV, "192.168.0.10");
        std::env::set_var(PORT_ENV, "not-a-port");
        assert!(matches!(
            NotificationConfig::from_env(),
            Err(NotificationError::Configuration(_))
        ));

        std::env::set_var(PORT_ENV, " 8080 ");
        let config = NotificationConfig::from_env().unwrap();
        assert_eq!(config.listen_address().unwrap(), ("192.168.0.10", 8080));

        std::env::remove_var(HOST_ENV);
        std::env::remove_var(PORT_ENV);
    }
}
