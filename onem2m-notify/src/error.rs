use callback_server::ServerError;
use onem2m_resource::ResourceType;
use thiserror::Error;

/// Errors that can occur in the notification service
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The resource type cannot carry a `<subscription>`
    #[error("Subscriptions are not supported for resource type {0}")]
    NotSupported(ResourceType),

    /// Listen host or port missing or unusable
    #[error("Invalid notification configuration: {0}")]
    Configuration(String),

    /// The resource lacks what a subscription needs, such as its identifier
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// The operation needs a running listener; call `setup()` first
    #[error("Notification service is not running")]
    NotRunning,

    /// The listener could not be started
    #[error("Notification listener failed: {0}")]
    Listener(#[from] ServerError),

    /// Internal lock was poisoned by a panicking thread
    #[error("Internal lock poisoned")]
    LockPoisoned,

    /// The listener thread went away before reporting back
    #[error("Listener worker disconnected")]
    WorkerDisconnected,
}

/// Result type for notification operations
pub type Result<T> = std::result::Result<T, NotificationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NotificationError::NotSupported(ResourceType::ContentInstance).to_string(),
            "Subscriptions are not supported for resource type cin (ty=4)"
        );
        assert_eq!(
            NotificationError::Configuration("missing host".to_string()).to_string(),
            "Invalid notification configuration: missing host"
        );
        assert_eq!(
            NotificationError::NotRunning.to_string(),
            "Notification service is not running"
        );
    }
}
