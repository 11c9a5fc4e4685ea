//! Core value types shared by the resource model and the codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// XML namespace used for oneM2M resource elements.
pub const M2M_NAMESPACE: &str = "http://www.onem2m.org/xml/protocols";

/// Namespace prefix used for oneM2M resource elements and JSON keys.
pub const M2M_PREFIX: &str = "m2m";

/// oneM2M resource types understood by this crate.
///
/// The discriminants are the numeric `ty` codes defined by oneM2M TS-0004.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    AccessControlPolicy,
    Ae,
    Container,
    ContentInstance,
    CseBase,
    Group,
    RemoteCse,
    Subscription,
}

impl ResourceType {
    /// All known resource types, ordered by type code.
    pub const ALL: [ResourceType; 8] = [
        ResourceType::AccessControlPolicy,
        ResourceType::Ae,
        ResourceType::Container,
        ResourceType::ContentInstance,
        ResourceType::CseBase,
        ResourceType::Group,
        ResourceType::RemoteCse,
        ResourceType::Subscription,
    ];

    /// The numeric `ty` code of this resource type.
    pub fn code(self) -> i64 {
        match self {
            ResourceType::AccessControlPolicy => 1,
            ResourceType::Ae => 2,
            ResourceType::Container => 3,
            ResourceType::ContentInstance => 4,
            ResourceType::CseBase => 5,
            ResourceType::Group => 9,
            ResourceType::RemoteCse => 16,
            ResourceType::Subscription => 23,
        }
    }

    /// Look up a resource type by its numeric `ty` code.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The short name used as XML element name and JSON key (without prefix).
    pub fn short_name(self) -> &'static str {
        match self {
            ResourceType::AccessControlPolicy => "acp",
            ResourceType::Ae => "ae",
            ResourceType::Container => "cnt",
            ResourceType::ContentInstance => "cin",
            ResourceType::CseBase => "cb",
            ResourceType::Group => "grp",
            ResourceType::RemoteCse => "csr",
            ResourceType::Subscription => "sub",
        }
    }

    /// Look up a resource type by its short name, with or without `m2m:` prefix.
    pub fn from_short_name(name: &str) -> Option<Self> {
        let local = strip_prefix(name);
        Self::ALL.into_iter().find(|t| t.short_name() == local)
    }

    /// Whether a `<subscription>` may be created as a child of this type.
    pub fn supports_subscription(self) -> bool {
        matches!(
            self,
            ResourceType::CseBase
                | ResourceType::Ae
                | ResourceType::AccessControlPolicy
                | ResourceType::Container
                | ResourceType::Group
                | ResourceType::RemoteCse
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ty={})", self.short_name(), self.code())
    }
}

/// Strip an `m2m:` (or any other) namespace prefix from a key or element name.
pub fn strip_prefix(name: &str) -> &str {
    match name.find(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// What a notification carries about the changed resource (`nct`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationContentType {
    /// The full representation of the modified resource
    #[default]
    AllAttributes,
    /// Only the attributes that changed
    ModifiedAttributes,
    /// Only the resource identifier
    ResourceId,
}

impl NotificationContentType {
    pub fn code(self) -> i64 {
        match self {
            NotificationContentType::AllAttributes => 1,
            NotificationContentType::ModifiedAttributes => 2,
            NotificationContentType::ResourceId => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(NotificationContentType::AllAttributes),
            2 => Some(NotificationContentType::ModifiedAttributes),
            3 => Some(NotificationContentType::ResourceId),
            _ => None,
        }
    }
}

/// Serialization format of a resource body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Xml,
    #[default]
    Json,
}

impl Encoding {
    /// The MIME type sent in `Content-Type` and `Accept` headers.
    pub fn mime_type(self) -> &'static str {
        match self {
            Encoding::Xml => "application/xml",
            Encoding::Json => "application/json",
        }
    }

    /// Detect the encoding from a `Content-Type` header value.
    ///
    /// Accepts plain XML/JSON types, the oneM2M vendor types
    /// (`application/vnd.onem2m-res+json`) and trailing parameters such as
    /// `;ty=4` or `;charset=utf-8`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/xml" || mime == "text/xml" || mime.ends_with("+xml") {
            Some(Encoding::Xml)
        } else if mime == "application/json" || mime.ends_with("+json") {
            Some(Encoding::Json)
        } else {
            None
        }
    }

    /// Guess the encoding from the first non-whitespace byte of a body.
    pub fn sniff(body: &str) -> Option<Self> {
        match body.trim_start().chars().next() {
            Some('<') => Some(Encoding::Xml),
            Some('{') | Some('[') => Some(Encoding::Json),
            _ => None,
        }
    }
}

/// Whether a body is written for a create or an update request.
///
/// Some attributes (`rn`, `mnm`, `csy`) may only be sent on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_round_trip() {
        for ty in ResourceType::ALL {
            assert_eq!(ResourceType::from_code(ty.code()), Some(ty));
            assert_eq!(ResourceType::from_short_name(ty.short_name()), Some(ty));
        }
        assert_eq!(ResourceType::from_code(24), None);
        assert_eq!(ResourceType::from_short_name("m2m:cin"), Some(ResourceType::ContentInstance));
    }

    #[test]
    fn test_subscribable_types() {
        let subscribable: Vec<_> = ResourceType::ALL
            .into_iter()
            .filter(|t| t.supports_subscription())
            .collect();
        assert_eq!(subscribable.len(), 6);
        assert!(!ResourceType::ContentInstance.supports_subscription());
        assert!(!ResourceType::Subscription.supports_subscription());
    }

    #[test]
    fn test_encoding_from_content_type() {
        assert_eq!(Encoding::from_content_type("application/xml"), Some(Encoding::Xml));
        assert_eq!(
            Encoding::from_content_type("application/vnd.onem2m-ntfy+xml; charset=utf-8"),
            Some(Encoding::Xml)
        );
        assert_eq!(Encoding::from_content_type("Application/JSON;ty=4"), Some(Encoding::Json));
        assert_eq!(
            Encoding::from_content_type("application/vnd.onem2m-res+json"),
            Some(Encoding::Json)
        );
        assert_eq!(Encoding::from_content_type("text/plain"), None);
    }

    #[test]
    fn test_encoding_sniff() {
        assert_eq!(Encoding::sniff("  <m2m:sgn/>"), Some(Encoding::Xml));
        assert_eq!(Encoding::sniff("\n{\"m2m:sgn\":{}}"), Some(Encoding::Json));
        assert_eq!(Encoding::sniff("hello"), None);
        assert_eq!(Encoding::sniff(""), None);
    }

    #[test]
    fn test_notification_content_type_codes() {
        assert_eq!(NotificationContentType::default().code(), 1);
        assert_eq!(
            NotificationContentType::from_code(3),
            Some(NotificationContentType::ResourceId)
        );
        assert_eq!(NotificationContentType::from_code(7), None);
    }
}
