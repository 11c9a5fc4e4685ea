//! Subscription registry
//!
//! Tracks which remote `<subscription>` belongs to which local resource and
//! callback. Each registration is keyed by the owning resource's identifier;
//! a secondary index maps every accepted form of the subscription reference
//! (its resource id and its structured path) back to that owner.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use onem2m_resource::{NotificationContentType, Resource, ResourceType, Subscription};
use tracing::{debug, info, warn};

use crate::error::{NotificationError, Result};
use crate::transport::ResourceTransport;

/// Parents retrieved at most while resolving a structured path
const MAX_PARENT_DEPTH: usize = 16;

/// Callback invoked with the decoded resource of each notification
pub type NotificationCallback = Arc<dyn Fn(Resource) + Send + Sync>;

/// Canonical form of a subscription or resource reference.
pub struct SubscriptionRef;

impl SubscriptionRef {
    /// Trim whitespace, strip a leading `~` or `/~` Mca prefix and drop
    /// trailing slashes.
    ///
    /// ```
    /// use onem2m_notify::SubscriptionRef;
    ///
    /// assert_eq!(SubscriptionRef::normalize(" /~/mn-cse/sub-1/ "), "/mn-cse/sub-1");
    /// assert_eq!(SubscriptionRef::normalize("~/mn-cse/sub-1"), "/mn-cse/sub-1");
    /// assert_eq!(SubscriptionRef::normalize("sub-1"), "sub-1");
    /// ```
    pub fn normalize(reference: &str) -> String {
        let trimmed = reference.trim();
        let stripped = trimmed
            .strip_prefix("/~")
            .or_else(|| trimmed.strip_prefix('~'))
            .unwrap_or(trimmed);
        stripped.trim_end_matches('/').to_string()
    }
}

/// Attributes applied to every subscription the registry creates
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionOptions {
    pub notification_content_type: NotificationContentType,
    pub expiration_counter: Option<i64>,
}

/// One subscribed resource
#[derive(Clone)]
pub struct Registration {
    /// Normalized identifier of the owning resource
    pub owner_id: String,
    /// The owning resource as passed to `add`
    pub owner: Resource,
    /// The remote subscription as returned by the CSE
    pub subscription: Resource,
    /// Resource id used to delete the remote subscription
    pub subscription_id: String,
    /// Normalized references under which the subscription is indexed
    pub references: Vec<String>,
    /// Per-registration callback, overriding the service default
    pub callback: Option<NotificationCallback>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("owner_id", &self.owner_id)
            .field("subscription_id", &self.subscription_id)
            .field("references", &self.references)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    registrations: HashMap<String, Registration>,
    /// Normalized subscription reference -> owner id
    index: HashMap<String, String>,
}

impl RegistryState {
    fn insert(&mut self, registration: Registration) {
        for reference in &registration.references {
            self.index
                .insert(reference.clone(), registration.owner_id.clone());
        }
        self.registrations
            .insert(registration.owner_id.clone(), registration);
    }

    fn remove(&mut self, owner_id: &str) -> Option<Registration> {
        let registration = self.registrations.remove(owner_id)?;
        for reference in &registration.references {
            self.index.remove(reference);
        }
        Some(registration)
    }
}

/// Thread-safe registry of active subscriptions.
///
/// Remote calls go through the [`ResourceTransport`] and never happen while
/// the internal lock is held.
pub struct SubscriptionRegistry {
    transport: Arc<dyn ResourceTransport>,
    options: SubscriptionOptions,
    state: Mutex<RegistryState>,
}

impl SubscriptionRegistry {
    pub fn new(transport: Arc<dyn ResourceTransport>) -> Self {
        Self::with_options(transport, SubscriptionOptions::default())
    }

    pub fn with_options(transport: Arc<dyn ResourceTransport>, options: SubscriptionOptions) -> Self {
        Self {
            transport,
            options,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>> {
        self.state.lock().map_err(|_| NotificationError::LockPoisoned)
    }

    fn owner_key(resource: &Resource) -> Option<String> {
        resource
            .resource_id()
            .map(SubscriptionRef::normalize)
            .filter(|id| !id.is_empty())
    }

    /// Structured path of `resource`, retrieving its ancestors when unknown.
    ///
    /// Walks up `pi` links until a `<CSEBase>` (whose `rn` starts the path)
    /// or an ancestor with a known path. Returns `None` when a link is
    /// missing or the CSE cannot be reached.
    fn structured_path_of(&self, resource: &Resource) -> Option<String> {
        if let Some(path) = resource.structured_path() {
            return Some(path.to_string());
        }

        let mut names = Vec::new();
        let mut current = resource.clone();
        for _ in 0..MAX_PARENT_DEPTH {
            if let Some(path) = current.structured_path() {
                names.push(path.trim_end_matches('/').to_string());
                names.reverse();
                return Some(names.join("/"));
            }

            let is_root = current.resource_type() == ResourceType::CseBase;
            if current.resource_name().is_none() || (!is_root && current.base().parent_id.is_none()) {
                let id = current.resource_id()?.to_string();
                current = self.fetch(&id)?;
            }
            names.push(current.resource_name()?.to_string());

            if is_root {
                names.reverse();
                return Some(names.join("/"));
            }
            let parent_id = current.base().parent_id.clone()?;
            current = self.fetch(&parent_id)?;
        }
        None
    }

    fn fetch(&self, resource_id: &str) -> Option<Resource> {
        match self.transport.retrieve(resource_id) {
            Ok(resource) => Some(resource),
            Err(e) => {
                debug!(resource = %resource_id, error = %e, "Failed to retrieve ancestor");
                None
            }
        }
    }

    /// Subscribe to `resource`, directing notifications to `notification_uri`.
    ///
    /// Returns `Ok(true)` when the resource is (or already was) subscribed and
    /// `Ok(false)` when the CSE refused or could not be reached.
    pub fn add(
        &self,
        resource: &Resource,
        callback: Option<NotificationCallback>,
        notification_uri: &str,
    ) -> Result<bool> {
        let resource_type = resource.resource_type();
        if !resource_type.supports_subscription() {
            return Err(NotificationError::NotSupported(resource_type));
        }
        let owner_id = Self::owner_key(resource).ok_or_else(|| {
            NotificationError::InvalidResource(format!("{} has no resource id", resource_type))
        })?;

        if self.lock()?.registrations.contains_key(&owner_id) {
            return Ok(true);
        }

        let mut subscription = Subscription::with_notification_uri(vec![notification_uri.to_string()]);
        subscription.notification_content_type = Some(self.options.notification_content_type);
        subscription.expiration_counter = self.options.expiration_counter;

        let owner_path = self.structured_path_of(resource);
        if owner_path.is_none() {
            warn!(owner = %owner_id, "Structured path unknown, only the subscription id will resolve");
        }

        let parent_id = resource.resource_id().unwrap_or(&owner_id);
        let mut created = match self.transport.create(parent_id, &Resource::from(subscription)) {
            Ok(created) => created,
            Err(e) => {
                warn!(owner = %owner_id, error = %e, "Failed to create subscription");
                return Ok(false);
            }
        };

        let subscription_id = match created.resource_id() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => {
                warn!(owner = %owner_id, "CSE returned a subscription without resource id");
                return Ok(false);
            }
        };

        let structured_path = match (&owner_path, created.resource_name()) {
            (Some(path), Some(name)) => Some(format!("{}/{}", path.trim_end_matches('/'), name)),
            _ => None,
        };
        let mut references = vec![SubscriptionRef::normalize(&subscription_id)];
        if let Some(path) = &structured_path {
            references.push(SubscriptionRef::normalize(path));
            created.base_mut().structured_path = Some(path.clone());
        }
        references.dedup();

        let registration = Registration {
            owner_id: owner_id.clone(),
            owner: resource.clone(),
            subscription: created,
            subscription_id,
            references,
            callback,
        };

        let duplicate = {
            let mut state = self.lock()?;
            if state.registrations.contains_key(&owner_id) {
                Some(registration)
            } else {
                debug!(owner = %owner_id, references = ?registration.references, "Subscription registered");
                state.insert(registration);
                None
            }
        };

        // Another caller registered the same owner while we were creating.
        if let Some(duplicate) = duplicate {
            debug!(owner = %owner_id, "Discarding duplicate subscription");
            if let Err(e) = self.transport.delete(&duplicate.subscription_id) {
                warn!(
                    subscription = %duplicate.subscription_id,
                    error = %e,
                    "Failed to delete duplicate subscription"
                );
            }
        }

        Ok(true)
    }

    /// Remove the subscription on `resource`.
    ///
    /// Local state is dropped only once the CSE confirmed the deletion, so a
    /// failed removal can be retried.
    pub fn remove(&self, resource: &Resource) -> Result<bool> {
        let resource_type = resource.resource_type();
        if !resource_type.supports_subscription() {
            return Err(NotificationError::NotSupported(resource_type));
        }
        let Some(owner_id) = Self::owner_key(resource) else {
            return Ok(false);
        };

        let subscription_id = match self.lock()?.registrations.get(&owner_id) {
            Some(registration) => registration.subscription_id.clone(),
            None => return Ok(false),
        };

        match self.transport.delete(&subscription_id) {
            Ok(()) => {
                let mut state = self.lock()?;
                if state
                    .registrations
                    .get(&owner_id)
                    .is_some_and(|r| r.subscription_id == subscription_id)
                {
                    state.remove(&owner_id);
                }
                debug!(owner = %owner_id, "Subscription removed");
                Ok(true)
            }
            Err(e) => {
                warn!(owner = %owner_id, subscription = %subscription_id, error = %e, "Failed to delete subscription");
                Ok(false)
            }
        }
    }

    /// Remove every subscription.
    ///
    /// Local state is always cleared. Remote deletions are best-effort; the
    /// number that failed is returned.
    pub fn remove_all(&self) -> Result<usize> {
        let registrations: Vec<Registration> = {
            let mut state = self.lock()?;
            state.index.clear();
            state.registrations.drain().map(|(_, r)| r).collect()
        };

        let total = registrations.len();
        let failures = registrations
            .into_iter()
            .filter(|registration| match self.transport.delete(&registration.subscription_id) {
                Ok(()) => false,
                Err(e) => {
                    warn!(
                        subscription = %registration.subscription_id,
                        error = %e,
                        "Failed to delete subscription"
                    );
                    true
                }
            })
            .count();

        if total > 0 {
            info!(total, failures, "Removed all subscriptions");
        }
        Ok(failures)
    }

    /// Whether `resource` currently has a subscription managed here.
    pub fn has(&self, resource: &Resource) -> bool {
        if !resource.resource_type().supports_subscription() {
            return false;
        }
        let Some(owner_id) = Self::owner_key(resource) else {
            return false;
        };
        self.lock()
            .map(|state| state.registrations.contains_key(&owner_id))
            .unwrap_or(false)
    }

    /// Owner id for a subscription reference in either accepted form.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let key = SubscriptionRef::normalize(reference);
        self.lock().ok()?.index.get(&key).cloned()
    }

    /// The registration a subscription reference points to.
    pub fn registration(&self, reference: &str) -> Option<Registration> {
        let key = SubscriptionRef::normalize(reference);
        let state = self.lock().ok()?;
        let owner_id = state.index.get(&key)?;
        state.registrations.get(owner_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.registrations.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(SubscriptionRef::normalize("/mn-cse/sub-1"), "/mn-cse/sub-1");
        assert_eq!(SubscriptionRef::normalize("/~/mn-cse/sub-1"), "/mn-cse/sub-1");
        assert_eq!(SubscriptionRef::normalize("~/mn-cse/sub-1"), "/mn-cse/sub-1");
        assert_eq!(SubscriptionRef::normalize("  sub-1//  "), "sub-1");
        assert_eq!(SubscriptionRef::normalize(""), "");
    }

    #[test]
    fn test_state_insert_and_remove_keep_index_in_step() {
        let mut state = RegistryState::default();
        state.insert(Registration {
            owner_id: "cnt-1".to_string(),
            owner: Resource::from(onem2m_resource::Container::default()),
            subscription: Resource::from(Subscription::default()),
            subscription_id: "sub-1".to_string(),
            references: vec!["sub-1".to_string(), "/cse/ae/cnt/sub_1".to_string()],
            callback: None,
        });

        assert_eq!(state.index.len(), 2);
        assert!(state.remove("cnt-1").is_some());
        assert!(state.index.is_empty());
        assert!(state.registrations.is_empty());
        assert!(state.remove("cnt-1").is_none());
    }
}
