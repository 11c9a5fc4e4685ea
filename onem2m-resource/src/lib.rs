//! oneM2M resource model and codec
//!
//! This crate provides typed oneM2M resources and their XML and JSON
//! representations. It is used by the Mca client to build request bodies
//! and by the notification service to decode notification payloads.
//!
//! Attribute mapping is written once per resource type against the
//! [`FieldSource`]/[`FieldSink`] traits and shared by both formats.

mod codec;
mod error;
mod fields;
pub mod json;
mod registry;
mod resource;
mod types;
pub mod xml;

pub use codec::{decode, decode_auto, encode, merge};
pub use error::{CodecError, CodecResult};
pub use fields::{parse_bool, FieldSink, FieldSource};
pub use json::{decode_json, encode_json, merge_json};
pub use registry::{entry_for_code, entry_for_name, new_resource, ResourceTypeEntry, RESOURCE_TYPES};
pub use resource::{
    AccessControlPolicy, AccessControlRule, Ae, Container, ContentInstance, CseBase, Group,
    RemoteCse, Resource, ResourceBase, Subscription,
};
pub use types::{
    strip_prefix, Encoding, NotificationContentType, ResourceType, WriteMode, M2M_NAMESPACE,
    M2M_PREFIX,
};
pub use xml::{decode_xml, encode_xml, merge_xml, parse_xml};

// Re-exported so callers can hand parsed trees to `decode_xml`/`decode_json`.
pub use serde_json;
pub use xmltree;
