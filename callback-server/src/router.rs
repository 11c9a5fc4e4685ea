//! Notification routing for HTTP callbacks.
//!
//! This module provides the `NotificationRouter`, which forwards every
//! received notification body to a channel while dispatch is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Unparsed notification received via HTTP callback.
///
/// Carries the raw body and the headers needed to decode it, with no
/// knowledge of subscriptions or resource types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Value of the `X-M2M-RI` request identifier header, if any
    pub request_id: Option<String>,
    /// The raw request body
    pub body: String,
}

/// Forwards notifications from HTTP callbacks to a channel.
///
/// The router holds a shared enabled flag. While it is cleared, payloads are
/// dropped; the HTTP endpoint keeps acknowledging either way. Clones share
/// the same flag and channel.
#[derive(Debug, Clone)]
pub struct NotificationRouter {
    enabled: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<NotificationPayload>,
}

impl NotificationRouter {
    /// Create an enabled router.
    ///
    /// # Example
    ///
    /// ```
    /// use tokio::sync::mpsc;
    /// use callback_server::{NotificationPayload, NotificationRouter};
    ///
    /// let (tx, _rx) = mpsc::unbounded_channel::<NotificationPayload>();
    /// let router = NotificationRouter::new(tx);
    /// assert!(router.is_enabled());
    /// ```
    pub fn new(sender: mpsc::UnboundedSender<NotificationPayload>) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            sender,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Forward a payload to the channel.
    ///
    /// Returns `true` if the payload was handed over, `false` if dispatch is
    /// disabled or the receiving side is gone.
    pub fn route(&self, payload: NotificationPayload) -> bool {
        if !self.is_enabled() {
            trace!("Dispatch disabled, dropping notification");
            return false;
        }
        self.sender.send(payload).is_ok()
    }
}
