//! XML backend built on `xmltree`.
//!
//! oneM2M XML puts the resource under a prefixed root element
//! (`<m2m:cin xmlns:m2m="..." rn="name">`) and every attribute in an
//! unprefixed child element. List attributes are whitespace separated.

use xmltree::{Element, Namespace, XMLNode};

use crate::error::{CodecError, CodecResult};
use crate::fields::{FieldSink, FieldSource};
use crate::registry::{entry_for_code, entry_for_name};
use crate::resource::Resource;
use crate::types::{strip_prefix, WriteMode, M2M_NAMESPACE, M2M_PREFIX};

/// Parse a document into its root element.
pub fn parse_xml(payload: &str) -> CodecResult<Element> {
    Element::parse(payload.as_bytes()).map_err(|e| CodecError::Xml(e.to_string()))
}

/// [`FieldSource`] over one element.
#[derive(Debug, Clone, Copy)]
pub struct XmlSource<'a> {
    element: &'a Element,
}

impl<'a> XmlSource<'a> {
    pub fn new(element: &'a Element) -> Self {
        Self { element }
    }
}

/// Child elements whose local name is `key`.
fn named_children<'e>(element: &'e Element, key: &str) -> Vec<&'e Element> {
    element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(child) if strip_prefix(&child.name) == key => Some(child),
            _ => None,
        })
        .collect()
}

fn first_child<'e>(element: &'e Element, key: &str) -> Option<&'e Element> {
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) if strip_prefix(&child.name) == key => Some(child),
        _ => None,
    })
}

impl<'a> FieldSource for XmlSource<'a> {
    fn resource_name(&self) -> Option<String> {
        self.element
            .attributes
            .get("rn")
            .cloned()
            .or_else(|| self.text("rn"))
    }

    fn text(&self, key: &str) -> Option<String> {
        let child = first_child(self.element, key)?;
        child.get_text().map(|text| text.trim().to_string())
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.text(key)
            .map(|text| text.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn child(&self, key: &str) -> Option<Self> {
        first_child(self.element, key).map(XmlSource::new)
    }

    fn children(&self, key: &str) -> Vec<Self> {
        named_children(self.element, key)
            .into_iter()
            .map(XmlSource::new)
            .collect()
    }
}

/// [`FieldSink`] building an element tree.
#[derive(Debug)]
pub struct XmlSink {
    element: Element,
    is_root: bool,
}

impl XmlSink {
    /// A sink for a resource root element, `m2m:<short_name>`.
    pub fn root(short_name: &str) -> Self {
        let mut element = Element::new(short_name);
        element.prefix = Some(M2M_PREFIX.to_string());
        element.namespace = Some(M2M_NAMESPACE.to_string());
        let mut namespaces = Namespace::empty();
        namespaces.put(M2M_PREFIX, M2M_NAMESPACE);
        element.namespaces = Some(namespaces);
        Self {
            element,
            is_root: true,
        }
    }

    fn nested(name: &str) -> Self {
        Self {
            element: Element::new(name),
            is_root: false,
        }
    }

    pub fn into_element(self) -> Element {
        self.element
    }
}

impl FieldSink for XmlSink {
    fn put_text(&mut self, key: &str, value: &str) {
        if self.is_root && key == "rn" {
            self.element
                .attributes
                .insert("rn".to_string(), value.to_string());
            return;
        }
        let mut child = Element::new(key);
        child.children.push(XMLNode::Text(value.to_string()));
        self.element.children.push(XMLNode::Element(child));
    }

    fn put_integer(&mut self, key: &str, value: i64) {
        self.put_text(key, &value.to_string());
    }

    fn put_boolean(&mut self, key: &str, value: bool) {
        self.put_text(key, if value { "true" } else { "false" });
    }

    fn put_list(&mut self, key: &str, values: &[String]) {
        self.put_text(key, &values.join(" "));
    }

    fn put_nested<F>(&mut self, key: &str, fill: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut nested = XmlSink::nested(key);
        fill(&mut nested);
        self.element
            .children
            .push(XMLNode::Element(nested.into_element()));
    }

    fn put_nested_list<T, F>(&mut self, key: &str, items: &[T], mut fill: F)
    where
        F: FnMut(&mut Self, &T),
    {
        for item in items {
            let mut nested = XmlSink::nested(key);
            fill(&mut nested, item);
            self.element
                .children
                .push(XMLNode::Element(nested.into_element()));
        }
    }
}

/// Decode a resource from its root element.
///
/// With a type code the root name must match it. Without one the type is
/// taken from the root name.
pub fn decode_xml(code: Option<i64>, element: &Element) -> CodecResult<Resource> {
    let by_name = entry_for_name(&element.name);
    let entry = match code {
        Some(code) => {
            let entry = entry_for_code(code).ok_or(CodecError::UnknownType(code))?;
            if by_name.is_some_and(|named| named.resource_type != entry.resource_type) {
                return Err(CodecError::WrongRoot {
                    expected: entry.short_name,
                    found: element.name.clone(),
                });
            }
            entry
        }
        None => by_name.ok_or_else(|| CodecError::MissingType(element.name.clone()))?,
    };

    let mut resource = (entry.construct)();
    resource.read_fields(&XmlSource::new(element));
    Ok(resource)
}

/// Overwrite `resource`'s attributes with those present under `element`.
pub fn merge_xml(resource: &mut Resource, element: &Element) -> CodecResult<()> {
    let expected = resource.resource_type();
    if entry_for_name(&element.name).is_some_and(|named| named.resource_type != expected) {
        return Err(CodecError::WrongRoot {
            expected: expected.short_name(),
            found: element.name.clone(),
        });
    }
    resource.read_fields(&XmlSource::new(element));
    Ok(())
}

/// Encode a resource as an XML document.
pub fn encode_xml(resource: &Resource, mode: WriteMode) -> CodecResult<String> {
    let mut sink = XmlSink::root(resource.resource_type().short_name());
    resource.write_fields(&mut sink, mode);

    let mut buffer = Vec::new();
    sink.into_element()
        .write(&mut buffer)
        .map_err(|e| CodecError::Xml(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| CodecError::Xml(e.to_string()))
}
