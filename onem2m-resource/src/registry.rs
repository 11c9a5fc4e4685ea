//! Static type table mapping `ty` codes and short names to constructors.

use crate::resource::{
    AccessControlPolicy, Ae, Container, ContentInstance, CseBase, Group, RemoteCse, Resource,
    Subscription,
};
use crate::types::{strip_prefix, ResourceType};

/// One row of the resource type table.
pub struct ResourceTypeEntry {
    pub resource_type: ResourceType,
    pub short_name: &'static str,
    pub construct: fn() -> Resource,
}

/// Every resource type the codec can materialize.
pub static RESOURCE_TYPES: &[ResourceTypeEntry] = &[
    ResourceTypeEntry {
        resource_type: ResourceType::AccessControlPolicy,
        short_name: "acp",
        construct: || Resource::AccessControlPolicy(AccessControlPolicy::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::Ae,
        short_name: "ae",
        construct: || Resource::Ae(Ae::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::Container,
        short_name: "cnt",
        construct: || Resource::Container(Container::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::ContentInstance,
        short_name: "cin",
        construct: || Resource::ContentInstance(ContentInstance::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::CseBase,
        short_name: "cb",
        construct: || Resource::CseBase(CseBase::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::Group,
        short_name: "grp",
        construct: || Resource::Group(Group::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::RemoteCse,
        short_name: "csr",
        construct: || Resource::RemoteCse(RemoteCse::default()),
    },
    ResourceTypeEntry {
        resource_type: ResourceType::Subscription,
        short_name: "sub",
        construct: || Resource::Subscription(Subscription::default()),
    },
];

pub fn entry_for_code(code: i64) -> Option<&'static ResourceTypeEntry> {
    RESOURCE_TYPES
        .iter()
        .find(|entry| entry.resource_type.code() == code)
}

/// Look up an entry by element name or JSON key, with or without `m2m:`.
pub fn entry_for_name(name: &str) -> Option<&'static ResourceTypeEntry> {
    let local = strip_prefix(name);
    RESOURCE_TYPES.iter().find(|entry| entry.short_name == local)
}

/// An empty resource of the given type code.
pub fn new_resource(code: i64) -> Option<Resource> {
    entry_for_code(code).map(|entry| (entry.construct)())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_consistent() {
        assert_eq!(RESOURCE_TYPES.len(), ResourceType::ALL.len());
        for entry in RESOURCE_TYPES {
            assert_eq!(entry.short_name, entry.resource_type.short_name());
            assert_eq!((entry.construct)().resource_type(), entry.resource_type);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(
            new_resource(23).map(|r| r.resource_type()),
            Some(ResourceType::Subscription)
        );
        assert!(new_resource(99).is_none());
        assert_eq!(
            entry_for_name("m2m:cnt").map(|e| e.resource_type),
            Some(ResourceType::Container)
        );
        assert!(entry_for_name("m2m:sgn").is_none());
    }
}
