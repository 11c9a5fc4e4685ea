//! Logging setup for applications using the notification service
//!
//! The library itself only emits `tracing` events. Applications that do not
//! install their own subscriber can call one of these initializers once at
//! startup.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable overriding the log level or filter directive
pub const LOG_LEVEL_ENV: &str = "ONEM2M_LOG_LEVEL";

/// Environment variable restricting output to one target, e.g. `onem2m_notify::dispatcher`
pub const LOG_TARGET_ENV: &str = "ONEM2M_LOG_TARGET";

/// Environment variable selecting the mode for [`init_logging_from_env`]
pub const LOG_MODE_ENV: &str = "ONEM2M_LOG_MODE";

/// Logging mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Pretty output at `debug` with thread ids and source locations
    Debug,
    /// One JSON object per event at `info`
    Json,
}

impl LoggingMode {
    /// Parse a mode name as used in `ONEM2M_LOG_MODE`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(Self::Silent),
            "development" => Some(Self::Development),
            "debug" => Some(Self::Debug),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// # Examples
///
/// ```rust,ignore
/// onem2m_notify::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `ONEM2M_LOG_LEVEL`: override the level (error, warn, info, debug, trace)
/// - `ONEM2M_LOG_TARGET`: only log events from this target
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(fmt::layer().json().with_current_span(false))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `ONEM2M_LOG_MODE`
///
/// Unset means silent; an unknown mode name is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(LOG_MODE_ENV) {
        Ok(name) => LoggingMode::from_name(&name)
            .ok_or_else(|| LoggingError::InvalidEnv(format!("{}={}", LOG_MODE_ENV, name)))?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

/// Build the filter from `ONEM2M_LOG_LEVEL`, then `RUST_LOG`, then the default,
/// narrowed to `ONEM2M_LOG_TARGET` when set.
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    let directive = match std::env::var(LOG_TARGET_ENV) {
        Ok(target) if !target.trim().is_empty() && !level.contains('=') => {
            format!("{}={}", target.trim(), level)
        }
        _ => level,
    };

    EnvFilter::try_new(&directive)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directive, e)))
}

/// Whether a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

/// Same as `init_logging(LoggingMode::Silent)`
pub fn init_silent() -> Result<(), LoggingError> {
    init_logging(LoggingMode::Silent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
        assert!(init_silent().is_ok());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(LoggingMode::from_name("silent"), Some(LoggingMode::Silent));
        assert_eq!(LoggingMode::from_name(" Debug "), Some(LoggingMode::Debug));
        assert_eq!(LoggingMode::from_name("json"), Some(LoggingMode::Json));
        assert_eq!(LoggingMode::from_name("verbose"), None);
    }

    #[test]
    fn test_default_filter() {
        std::env::remove_var(LOG_LEVEL_ENV);
        std::env::remove_var(LOG_TARGET_ENV);
        assert!(create_env_filter("warn").is_ok());
    }
}
