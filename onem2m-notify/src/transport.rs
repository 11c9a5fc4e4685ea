//! The seam between the registry and the CSE.

use mca_client::{McaClient, McaError};
use onem2m_resource::Resource;

/// Creates, looks up and deletes remote resources on behalf of the registry.
///
/// Implementations block until the CSE answers or their timeout expires.
pub trait ResourceTransport: Send + Sync {
    /// Create `resource` under `parent_id`, returning it with the identifier
    /// and name the CSE assigned.
    fn create(&self, parent_id: &str, resource: &Resource) -> Result<Resource, McaError>;

    /// Retrieve a resource by identifier.
    fn retrieve(&self, resource_id: &str) -> Result<Resource, McaError>;

    /// Delete the resource with the given identifier.
    fn delete(&self, resource_id: &str) -> Result<(), McaError>;
}

impl ResourceTransport for McaClient {
    fn create(&self, parent_id: &str, resource: &Resource) -> Result<Resource, McaError> {
        McaClient::create(self, parent_id, resource)
    }

    fn retrieve(&self, resource_id: &str) -> Result<Resource, McaError> {
        McaClient::retrieve(self, resource_id)
    }

    fn delete(&self, resource_id: &str) -> Result<(), McaError> {
        McaClient::delete(self, resource_id)
    }
}
