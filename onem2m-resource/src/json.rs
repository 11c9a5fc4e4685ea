//! JSON backend built on `serde_json`.
//!
//! A resource is a single-key object, `{"m2m:cin": {...}}`, whose value holds
//! the attributes under their short names.

use serde_json::{Map, Number, Value};

use crate::error::{CodecError, CodecResult};
use crate::fields::{FieldSink, FieldSource};
use crate::registry::{entry_for_code, entry_for_name, ResourceTypeEntry};
use crate::resource::Resource;
use crate::types::{WriteMode, M2M_PREFIX};

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// [`FieldSource`] over one JSON object.
#[derive(Debug, Clone, Copy)]
pub struct JsonSource<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> JsonSource<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }
}

impl<'a> FieldSource for JsonSource<'a> {
    fn resource_name(&self) -> Option<String> {
        self.text("rn")
    }

    fn text(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(scalar_text)
    }

    fn list(&self, key: &str) -> Vec<String> {
        match self.map.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    fn child(&self, key: &str) -> Option<Self> {
        match self.map.get(key) {
            Some(Value::Object(map)) => Some(JsonSource::new(map)),
            _ => None,
        }
    }

    fn children(&self, key: &str) -> Vec<Self> {
        match self.map.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(JsonSource::new)
                .collect(),
            Some(Value::Object(map)) => vec![JsonSource::new(map)],
            _ => Vec::new(),
        }
    }
}

/// [`FieldSink`] building a JSON object.
#[derive(Debug, Default)]
pub struct JsonSink {
    map: Map<String, Value>,
}

impl JsonSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }
}

impl FieldSink for JsonSink {
    fn put_text(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), Value::String(value.to_string()));
    }

    fn put_integer(&mut self, key: &str, value: i64) {
        self.map.insert(key.to_string(), Value::Number(Number::from(value)));
    }

    fn put_boolean(&mut self, key: &str, value: bool) {
        self.map.insert(key.to_string(), Value::Bool(value));
    }

    fn put_list(&mut self, key: &str, values: &[String]) {
        let items = values.iter().cloned().map(Value::String).collect();
        self.map.insert(key.to_string(), Value::Array(items));
    }

    fn put_nested<F>(&mut self, key: &str, fill: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut nested = JsonSink::new();
        fill(&mut nested);
        self.map
            .insert(key.to_string(), Value::Object(nested.into_map()));
    }

    fn put_nested_list<T, F>(&mut self, key: &str, items: &[T], mut fill: F)
    where
        F: FnMut(&mut Self, &T),
    {
        let entries = items
            .iter()
            .map(|item| {
                let mut nested = JsonSink::new();
                fill(&mut nested, item);
                Value::Object(nested.into_map())
            })
            .collect();
        self.map.insert(key.to_string(), Value::Array(entries));
    }
}

/// Pick the type entry and the attribute object out of a JSON value.
fn unwrap_root(
    code: Option<i64>,
    value: &Value,
) -> CodecResult<(&'static ResourceTypeEntry, &Map<String, Value>)> {
    let object = value
        .as_object()
        .ok_or_else(|| CodecError::MissingType("JSON value is not an object".to_string()))?;

    let wrapped = match object.iter().next() {
        Some((key, Value::Object(inner))) if object.len() == 1 => {
            entry_for_name(key).map(|entry| (key, entry, inner))
        }
        _ => None,
    };

    match (code, wrapped) {
        (Some(code), Some((key, named, inner))) => {
            let entry = entry_for_code(code).ok_or(CodecError::UnknownType(code))?;
            if named.resource_type != entry.resource_type {
                return Err(CodecError::WrongRoot {
                    expected: entry.short_name,
                    found: key.clone(),
                });
            }
            Ok((entry, inner))
        }
        (None, Some((_, named, inner))) => Ok((named, inner)),
        (Some(code), None) => {
            let entry = entry_for_code(code).ok_or(CodecError::UnknownType(code))?;
            Ok((entry, object))
        }
        (None, None) => {
            // A bare attribute object may still carry its own type code.
            let code = object
                .get("ty")
                .and_then(Value::as_i64)
                .ok_or_else(|| CodecError::MissingType("no root key and no ty".to_string()))?;
            let entry = entry_for_code(code).ok_or(CodecError::UnknownType(code))?;
            Ok((entry, object))
        }
    }
}

/// Decode a resource from a parsed JSON value.
pub fn decode_json(code: Option<i64>, value: &Value) -> CodecResult<Resource> {
    let (entry, attributes) = unwrap_root(code, value)?;
    let mut resource = (entry.construct)();
    resource.read_fields(&JsonSource::new(attributes));
    Ok(resource)
}

/// Overwrite `resource`'s attributes with those present in `value`.
///
/// Attributes absent from `value` keep their current values.
pub fn merge_json(resource: &mut Resource, value: &Value) -> CodecResult<()> {
    let (_, attributes) = unwrap_root(Some(resource.resource_type().code()), value)?;
    resource.read_fields(&JsonSource::new(attributes));
    Ok(())
}

/// Encode a resource as `{"m2m:<short_name>": {...}}`.
pub fn encode_json(resource: &Resource, mode: WriteMode) -> CodecResult<String> {
    let mut sink = JsonSink::new();
    resource.write_fields(&mut sink, mode);

    let mut root = Map::new();
    root.insert(
        format!("{}:{}", M2M_PREFIX, resource.resource_type().short_name()),
        Value::Object(sink.into_map()),
    );
    Ok(serde_json::to_string(&Value::Object(root))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Container, Subscription};
    use crate::types::{NotificationContentType, ResourceType};
    use serde_json::json;

    #[test]
    fn test_decode_wrapped_container() {
        let value = json!({
            "m2m:cnt": {
                "rn": "TEST_CONTAINER",
                "ty": 3,
                "ri": "/mn-cse/cnt-101",
                "lbl": ["a", "b"],
                "mni": 10,
                "cni": "2"
            }
        });

        let resource = decode_json(None, &value).unwrap();
        assert_eq!(resource.resource_type(), ResourceType::Container);
        assert_eq!(resource.resource_name(), Some("TEST_CONTAINER"));
        assert_eq!(resource.base().labels, vec!["a", "b"]);

        let cnt = resource.as_container().unwrap();
        assert_eq!(cnt.max_nr_of_instances, Some(10));
        assert_eq!(cnt.current_nr_of_instances, Some(2));
    }

    #[test]
    fn test_decode_bare_object_with_code() {
        let value = json!({ "ri": "/mn-cse/cin-1", "con": "Hello, World" });
        let resource = decode_json(Some(4), &value).unwrap();
        assert_eq!(
            resource.as_content_instance().and_then(|c| c.content.as_deref()),
            Some("Hello, World")
        );
    }

    #[test]
    fn test_decode_bare_object_with_ty() {
        let value = json!({ "ty": 23, "ri": "sub-1", "nu": "http://a http://b", "nct": 2 });
        let resource = decode_json(None, &value).unwrap();
        let sub = resource.as_subscription().unwrap();
        assert_eq!(sub.notification_uri, vec!["http://a", "http://b"]);
        assert_eq!(
            sub.notification_content_type,
            Some(NotificationContentType::ModifiedAttributes)
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_json(Some(99), &json!({})),
            Err(CodecError::UnknownType(99))
        ));
        assert!(matches!(
            decode_json(None, &json!({ "con": "x" })),
            Err(CodecError::MissingType(_))
        ));
        assert!(matches!(
            decode_json(Some(4), &json!({ "m2m:cnt": {} })),
            Err(CodecError::WrongRoot { expected: "cin", .. })
        ));
        assert!(matches!(
            decode_json(None, &json!([1, 2])),
            Err(CodecError::MissingType(_))
        ));
    }

    #[test]
    fn test_merge_keeps_local_fields() {
        let mut resource = Resource::from(Subscription::with_notification_uri(vec!["http://a".into()]))
            .with_structured_path("/mn-cse/mn-name/ae/sub_1");
        let reply = json!({ "m2m:sub": { "ri": "/mn-cse/sub-9", "ct": "20260101T000000" } });

        merge_json(&mut resource, &reply).unwrap();

        assert_eq!(resource.resource_id(), Some("/mn-cse/sub-9"));
        assert_eq!(resource.structured_path(), Some("/mn-cse/mn-name/ae/sub_1"));
        assert_eq!(resource.as_subscription().unwrap().notification_uri, vec!["http://a"]);
    }

    #[test]
    fn test_encode_subscription() {
        let mut sub = Subscription::with_notification_uri(vec!["http://localhost:1400".into()]);
        sub.base.resource_name = Some("sub_1".to_string());

        let body = encode_json(&Resource::from(sub), WriteMode::Create).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["m2m:sub"]["rn"], "sub_1");
        assert_eq!(value["m2m:sub"]["nu"], json!(["http://localhost:1400"]));
        assert_eq!(value["m2m:sub"]["nct"], 1);
    }

    #[test]
    fn test_encode_update_skips_read_only() {
        let container = Container {
            max_nr_of_instances: Some(5),
            current_nr_of_instances: Some(3),
            ..Default::default()
        };
        let resource = Resource::from(container).with_resource_id("/mn-cse/cnt-1");

        let body = encode_json(&resource, WriteMode::Update).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["m2m:cnt"]["mni"], 5);
        assert!(value["m2m:cnt"].get("cni").is_none());
        assert!(value["m2m:cnt"].get("ri").is_none());
    }
}
