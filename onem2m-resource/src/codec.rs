//! Format-dispatching entry points.

use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::json::{decode_json, encode_json, merge_json};
use crate::resource::Resource;
use crate::types::{Encoding, WriteMode};
use crate::xml::{decode_xml, encode_xml, merge_xml, parse_xml};

/// Decode a resource body.
///
/// `code` is the `ty` code when the caller knows it, for example from a
/// `Content-Type: ...;ty=4` header. Without it the type is taken from the
/// root element or key.
pub fn decode(code: Option<i64>, encoding: Encoding, payload: &str) -> CodecResult<Resource> {
    match encoding {
        Encoding::Xml => decode_xml(code, &parse_xml(payload)?),
        Encoding::Json => {
            let value: Value = serde_json::from_str(payload)?;
            decode_json(code, &value)
        }
    }
}

/// Encode a resource body for a create or update request.
pub fn encode(resource: &Resource, encoding: Encoding, mode: WriteMode) -> CodecResult<String> {
    match encoding {
        Encoding::Xml => encode_xml(resource, mode),
        Encoding::Json => encode_json(resource, mode),
    }
}

/// Update `resource` in place from a response body, such as the
/// representation a CSE returns after a create or update.
pub fn merge(resource: &mut Resource, encoding: Encoding, payload: &str) -> CodecResult<()> {
    match encoding {
        Encoding::Xml => merge_xml(resource, &parse_xml(payload)?),
        Encoding::Json => {
            let value: Value = serde_json::from_str(payload)?;
            merge_json(resource, &value)
        }
    }
}

/// Decode a body whose encoding is only known from a `Content-Type` header,
/// sniffing the payload when the header is absent or unrecognized.
pub fn decode_auto(
    code: Option<i64>,
    content_type: Option<&str>,
    payload: &str,
) -> CodecResult<Resource> {
    let encoding = content_type
        .and_then(Encoding::from_content_type)
        .or_else(|| Encoding::sniff(payload))
        .ok_or_else(|| CodecError::MissingType("unrecognized body encoding".to_string()))?;
    decode(code, encoding, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ContentInstance, Subscription};
    use crate::types::ResourceType;
    use rstest::rstest;

    #[rstest]
    #[case(Encoding::Xml)]
    #[case(Encoding::Json)]
    fn test_content_instance_survives_both_encodings(#[case] encoding: Encoding) {
        let mut cin = ContentInstance::with_content("Hello, World");
        cin.base.resource_name = Some("greeting".to_string());
        cin.base.labels = vec!["demo".to_string()];

        let body = encode(&Resource::from(cin), encoding, WriteMode::Create).unwrap();
        let decoded = decode(Some(4), encoding, &body).unwrap();

        assert_eq!(decoded.resource_name(), Some("greeting"));
        assert_eq!(decoded.base().labels, vec!["demo"]);
        assert_eq!(
            decoded.as_content_instance().and_then(|c| c.content.as_deref()),
            Some("Hello, World")
        );
    }

    #[rstest]
    #[case(Encoding::Xml)]
    #[case(Encoding::Json)]
    fn test_subscription_attributes_survive(#[case] encoding: Encoding) {
        let mut sub = Subscription::with_notification_uri(vec!["http://127.0.0.1:1400".into()]);
        sub.expiration_counter = Some(3);
        sub.latest_notify = Some(true);

        let body = encode(&Resource::from(sub.clone()), encoding, WriteMode::Create).unwrap();
        let decoded = decode(None, encoding, &body).unwrap();
        let decoded = decoded.as_subscription().unwrap();

        assert_eq!(decoded.notification_uri, sub.notification_uri);
        assert_eq!(decoded.expiration_counter, Some(3));
        assert_eq!(decoded.latest_notify, Some(true));
    }

    #[test]
    fn test_decode_auto() {
        let xml = r#"<m2m:cnt xmlns:m2m="http://www.onem2m.org/xml/protocols" rn="c"/>"#;
        let resource = decode_auto(None, None, xml).unwrap();
        assert_eq!(resource.resource_type(), ResourceType::Container);

        let json = r#"{"m2m:ae":{"rn":"app","api":"NdemoApp"}}"#;
        let resource = decode_auto(None, Some("application/vnd.onem2m-res+json"), json).unwrap();
        assert_eq!(resource.resource_type(), ResourceType::Ae);

        assert!(decode_auto(None, Some("text/plain"), "plain text").is_err());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode(None, Encoding::Xml, "<unclosed"),
            Err(CodecError::Xml(_))
        ));
        assert!(matches!(
            decode(None, Encoding::Json, "{not json"),
            Err(CodecError::Json(_))
        ));
    }
}
