//! Decoding of inbound notification bodies (`m2m:sgn`).
//!
//! CSEs differ in how they spell keys (`sur` vs `m2m:sur`) and how deep they
//! nest them, so fields are looked up by name anywhere in the document.

use onem2m_resource::serde_json::Value;
use onem2m_resource::xmltree::{Element, XMLNode};
use onem2m_resource::{
    decode_json, decode_xml, parse_bool, parse_xml, strip_prefix, CodecError, CodecResult,
    Encoding, Resource, M2M_PREFIX,
};

/// The changed resource carried in `rep`, still undecoded
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    Xml(Element),
    Json(Value),
}

/// A parsed notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEnvelope {
    /// `vrq`: sent by the CSE when the subscription is created
    pub verification: bool,
    /// `sur`: which subscription the notification belongs to
    pub subscription_reference: Option<String>,
    /// `sud`: the CSE deleted the subscription
    pub subscription_deleted: bool,
    /// `rss`: resource status
    pub resource_status: Option<i64>,
    /// `ty` of the representation, when present
    pub type_code: Option<i64>,
    pub representation: Option<Representation>,
}

impl NotificationEnvelope {
    pub fn parse(encoding: Encoding, body: &str) -> CodecResult<Self> {
        match encoding {
            Encoding::Xml => Self::from_xml(&parse_xml(body)?),
            Encoding::Json => {
                let value: Value = onem2m_resource::serde_json::from_str(body)?;
                Self::from_json(&value)
            }
        }
    }

    pub fn from_xml(root: &Element) -> CodecResult<Self> {
        let text = |name: &str| {
            find_element(root, name)
                .and_then(|e| e.get_text())
                .map(|t| t.trim().to_string())
        };

        // The resource is the first element inside <rep>.
        let representation = find_element(root, "rep").and_then(|rep| {
            rep.children.iter().find_map(|node| match node {
                XMLNode::Element(e) => Some(e.clone()),
                _ => None,
            })
        });
        let type_code = representation.as_ref().and_then(|resource| {
            find_element(resource, "ty")
                .and_then(|e| e.get_text())
                .and_then(|t| t.trim().parse().ok())
        });

        Ok(Self {
            verification: text("vrq").and_then(|v| parse_bool(&v)).unwrap_or(false),
            subscription_reference: text("sur").filter(|s| !s.is_empty()),
            subscription_deleted: text("sud").and_then(|v| parse_bool(&v)).unwrap_or(false),
            resource_status: text("rss").and_then(|v| v.parse().ok()),
            type_code,
            representation: representation.map(Representation::Xml),
        })
    }

    pub fn from_json(root: &Value) -> CodecResult<Self> {
        if !root.is_object() {
            return Err(CodecError::MissingType(
                "notification is not a JSON object".to_string(),
            ));
        }

        let representation = find_field(root, "rep").cloned();
        let type_code = representation
            .as_ref()
            .and_then(|rep| find_field(rep, "ty"))
            .and_then(json_integer);

        Ok(Self {
            verification: find_field(root, "vrq").is_some_and(json_truthy),
            subscription_reference: find_field(root, "sur")
                .and_then(json_text)
                .filter(|s| !s.is_empty()),
            subscription_deleted: find_field(root, "sud").is_some_and(json_truthy),
            resource_status: find_field(root, "rss").and_then(json_integer),
            type_code,
            representation: representation.map(Representation::Json),
        })
    }

    /// Decode the representation, or `None` if the notification has none.
    pub fn decode_resource(&self) -> Option<CodecResult<Resource>> {
        let resource = match self.representation.as_ref()? {
            Representation::Xml(element) => decode_xml(self.type_code, element),
            Representation::Json(value) => decode_json(self.type_code, value),
        };
        Some(resource)
    }
}

/// Depth-first search for the first element with local name `name`.
fn find_element<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) if strip_prefix(&child.name) == name => Some(child),
        XMLNode::Element(child) => find_element(child, name),
        _ => None,
    })
}

/// Recursive key lookup, trying the plain key before the `m2m:` form.
fn find_field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    find_key(value, name).or_else(|| find_key(value, &format!("{}:{}", M2M_PREFIX, name)))
}

fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_bool(s).unwrap_or(false),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
