//! Lifecycle of the notification service
//!
//! [`NotificationService`] owns the listener thread, the dispatch toggle and
//! the subscription registry. All methods are synchronous and may be called
//! from any thread, including from inside a notification callback.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use callback_server::{resolve_listen_address, NotificationRouter};
use onem2m_resource::Resource;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{NotificationError, Result};
use crate::registry::{NotificationCallback, SubscriptionOptions, SubscriptionRegistry};
use crate::transport::ResourceTransport;
use crate::worker::{spawn_listener, ListenerHandle};

#[derive(Default)]
struct ServiceState {
    listener: Option<ListenerHandle>,
    router: Option<NotificationRouter>,
    notification_uri: Option<String>,
}

/// Receives notifications from a CSE and routes them to callbacks.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mca_client::{McaClient, McaConfig};
/// use onem2m_notify::{NotificationConfig, NotificationService, Resource};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = McaClient::new(McaConfig::new("http://localhost:8080", "Cadmin"))?;
/// let service = NotificationService::new(NotificationConfig::default(), Arc::new(client));
///
/// service.setup(Some(Arc::new(|resource: Resource| println!("changed: {:?}", resource))))?;
/// // service.subscribe(&container, None)?;
/// service.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct NotificationService {
    config: NotificationConfig,
    registry: Arc<SubscriptionRegistry>,
    state: Mutex<ServiceState>,
}

impl NotificationService {
    /// Create a stopped service. Nothing is bound until [`setup`](Self::setup).
    pub fn new(config: NotificationConfig, transport: Arc<dyn ResourceTransport>) -> Self {
        let options = SubscriptionOptions {
            notification_content_type: config.notification_content_type,
            expiration_counter: config.expiration_counter,
        };
        Self {
            registry: Arc::new(SubscriptionRegistry::with_options(transport, options)),
            config,
            state: Mutex::new(ServiceState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ServiceState>> {
        self.state.lock().map_err(|_| NotificationError::LockPoisoned)
    }

    /// Start the listener and enable dispatch.
    ///
    /// Calling this on a running service does nothing, and the new default
    /// callback is ignored.
    pub fn setup(&self, default_callback: Option<NotificationCallback>) -> Result<()> {
        let mut state = self.lock()?;
        if state.listener.is_some() {
            debug!("Notification service already running");
            return Ok(());
        }

        let (host, port) = self.config.listen_address()?;
        let addr = resolve_listen_address(host, port)?;

        let (payload_tx, payload_rx) = mpsc::unbounded_channel();
        let router = NotificationRouter::new(payload_tx);
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.registry), default_callback));

        let listener = spawn_listener(
            addr,
            router.clone(),
            payload_rx,
            dispatcher,
            self.config.dispatch_drain_timeout,
        )?;

        let uri = notification_uri(host, listener.local_addr().port());
        info!(uri = %uri, local_addr = %listener.local_addr(), "Notification service started");

        state.notification_uri = Some(uri);
        state.router = Some(router);
        state.listener = Some(listener);
        Ok(())
    }

    /// Resume dispatching notifications.
    pub fn enable(&self) -> Result<()> {
        self.set_enabled(true)
    }

    /// Stop dispatching notifications. They are still acknowledged.
    pub fn disable(&self) -> Result<()> {
        self.set_enabled(false)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let state = self.lock()?;
        let router = state.router.as_ref().ok_or(NotificationError::NotRunning)?;
        router.set_enabled(enabled);
        debug!(enabled, "Notification dispatch toggled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.lock()
            .ok()
            .and_then(|state| state.router.as_ref().map(NotificationRouter::is_enabled))
            .unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .map(|state| state.listener.is_some())
            .unwrap_or(false)
    }

    /// The URI given to the CSE as `nu`, once set up
    pub fn listen_address(&self) -> Option<String> {
        self.lock().ok()?.notification_uri.clone()
    }

    /// The socket address the listener is bound to, once set up
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock()
            .ok()?
            .listener
            .as_ref()
            .map(ListenerHandle::local_addr)
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Subscribe to changes of `resource`.
    ///
    /// `callback` overrides the default callback for this resource. Returns
    /// `Ok(false)` if the CSE did not accept the subscription.
    pub fn subscribe(&self, resource: &Resource, callback: Option<NotificationCallback>) -> Result<bool> {
        let uri = self
            .lock()?
            .notification_uri
            .clone()
            .ok_or(NotificationError::NotRunning)?;
        self.registry.add(resource, callback, &uri)
    }

    /// Remove the subscription on `resource`.
    pub fn unsubscribe(&self, resource: &Resource) -> Result<bool> {
        self.registry.remove(resource)
    }

    pub fn has_subscription(&self, resource: &Resource) -> bool {
        self.registry.has(resource)
    }

    /// Remove every subscription, returning how many remote deletions failed.
    pub fn unsubscribe_all(&self) -> Result<usize> {
        self.registry.remove_all()
    }

    /// Remove all subscriptions, stop dispatching and stop the listener.
    ///
    /// Waits for in-flight callbacks up to the configured drain timeout. Does
    /// nothing if the service is not running. The service can be set up again
    /// afterwards.
    pub fn shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        let failures = self.registry.remove_all()?;
        if failures > 0 {
            warn!(failures, "Some subscriptions could not be deleted on the CSE");
        }

        let (router, listener) = {
            let mut state = self.lock()?;
            state.notification_uri = None;
            (state.router.take(), state.listener.take())
        };

        if let Some(router) = router {
            router.set_enabled(false);
        }
        // Joined outside the lock so callbacks can still call into the service.
        if let Some(listener) = listener {
            listener.stop();
        }

        info!("Notification service stopped");
        Ok(())
    }
}

impl Drop for NotificationService {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Notification service shutdown failed");
        }
    }
}

fn notification_uri(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_uri() {
        assert_eq!(notification_uri("localhost", 1400), "http://localhost:1400");
        assert_eq!(notification_uri("10.0.0.5", 8080), "http://10.0.0.5:8080");
        assert_eq!(notification_uri("::1", 9000), "http://[::1]:9000");
    }
}
