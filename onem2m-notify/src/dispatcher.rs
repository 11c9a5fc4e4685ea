//! Routing of decoded notifications to callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use callback_server::NotificationPayload;
use onem2m_resource::Encoding;
use tracing::{debug, error, info};

use crate::envelope::NotificationEnvelope;
use crate::registry::{NotificationCallback, SubscriptionRegistry};

/// What happened to one notification.
///
/// None of these is reported to the sender, which was acknowledged before
/// dispatch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Verification request; acknowledged, never dispatched
    Verification,
    /// No `sur` in the notification
    MissingReference,
    /// The CSE reported that it deleted the subscription
    SubscriptionDeleted,
    /// Body or representation could not be decoded
    Malformed,
    /// `sur` does not match any registration
    UnknownSubscription,
    /// Neither the registration nor the service has a callback
    NoCallback,
    /// The callback ran to completion
    Delivered,
    /// The callback panicked; the panic was contained
    CallbackPanicked,
}

/// Decodes notification payloads and invokes the matching callback.
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    default_callback: Option<NotificationCallback>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        default_callback: Option<NotificationCallback>,
    ) -> Self {
        Self {
            registry,
            default_callback,
        }
    }

    /// Handle one payload. Blocks for as long as the callback runs.
    pub fn dispatch(&self, payload: &NotificationPayload) -> DispatchOutcome {
        let encoding = payload
            .content_type
            .as_deref()
            .and_then(Encoding::from_content_type)
            .or_else(|| Encoding::sniff(&payload.body));
        let Some(encoding) = encoding else {
            debug!(content_type = ?payload.content_type, "Unrecognized notification encoding");
            return DispatchOutcome::Malformed;
        };

        let envelope = match NotificationEnvelope::parse(encoding, &payload.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "Malformed notification");
                return DispatchOutcome::Malformed;
            }
        };

        if envelope.verification {
            debug!(sur = ?envelope.subscription_reference, "Verification request");
            return DispatchOutcome::Verification;
        }

        let Some(reference) = envelope.subscription_reference.as_deref() else {
            debug!("Notification without subscription reference");
            return DispatchOutcome::MissingReference;
        };

        if envelope.subscription_deleted {
            info!(sur = reference, "CSE deleted subscription");
            return DispatchOutcome::SubscriptionDeleted;
        }

        let resource = match envelope.decode_resource() {
            Some(Ok(resource)) => resource,
            Some(Err(e)) => {
                debug!(sur = reference, error = %e, "Undecodable representation");
                return DispatchOutcome::Malformed;
            }
            None => {
                debug!(sur = reference, "Notification without representation");
                return DispatchOutcome::Malformed;
            }
        };

        let Some(registration) = self.registry.registration(reference) else {
            debug!(sur = reference, "Notification for unknown subscription");
            return DispatchOutcome::UnknownSubscription;
        };

        let Some(callback) = registration.callback.or_else(|| self.default_callback.clone()) else {
            debug!(sur = reference, owner = %registration.owner_id, "No callback for notification");
            return DispatchOutcome::NoCallback;
        };

        debug!(sur = reference, owner = %registration.owner_id, "Invoking callback");
        match catch_unwind(AssertUnwindSafe(|| callback(resource))) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(_) => {
                error!(sur = reference, owner = %registration.owner_id, "Notification callback panicked");
                DispatchOutcome::CallbackPanicked
            }
        }
    }
}
