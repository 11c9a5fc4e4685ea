//! # oneM2M Notifications
//!
//! A sync-first notification service for oneM2M resources: subscribe to a
//! resource on the CSE and get a callback with the decoded resource whenever
//! it changes.
//!
//! ## Overview
//!
//! All methods are synchronous. The HTTP listener and its async runtime live
//! in a dedicated background thread, and callbacks run on blocking worker
//! threads so a slow callback never holds up the listener.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mca_client::{McaClient, McaConfig};
//! use onem2m_notify::{NotificationConfig, NotificationService};
//!
//! let client = McaClient::new(McaConfig::new("http://localhost:8080", "Cadmin"))?;
//! let container = client.retrieve("/mn-cse/cnt-1")?;
//!
//! let service = NotificationService::new(NotificationConfig::default(), Arc::new(client));
//! service.setup(None)?;
//!
//! service.subscribe(&container, Some(Arc::new(|resource| {
//!     println!("New content: {:?}", resource.as_content_instance());
//! })))?;
//!
//! // ...
//! service.shutdown()?;
//! ```
//!
//! ## Architecture
//!
//! 1. **Listener**: every POST is answered with `X-M2M-RSC: 2000` before it
//!    is looked at
//! 2. **Dispatch**: the body is decoded; verification requests and unknown
//!    subscriptions end here
//! 3. **Registry**: the `sur` reference is resolved to the subscribed
//!    resource and its callback, falling back to the default callback
//! 4. **Shutdown**: subscriptions are deleted on the CSE, dispatch is
//!    disabled and the listener drains in-flight callbacks

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod registry;
pub mod service;
pub mod transport;
pub mod worker;

pub use config::NotificationConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use envelope::{NotificationEnvelope, Representation};
pub use error::{NotificationError, Result};
pub use registry::{
    NotificationCallback, Registration, SubscriptionOptions, SubscriptionRef, SubscriptionRegistry,
};
pub use service::NotificationService;
pub use transport::ResourceTransport;

// Re-export commonly used types from dependencies
pub use callback_server::NotificationPayload;
pub use onem2m_resource::{NotificationContentType, Resource, ResourceType};

/// Common imports for applications
pub mod prelude {
    pub use crate::{
        NotificationCallback, NotificationConfig, NotificationError, NotificationService,
        Resource, ResourceTransport, ResourceType,
    };
}
