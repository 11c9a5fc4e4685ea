//! Private Mca client for oneM2M CSE communication
//!
//! This crate provides a minimal blocking HTTP client for the oneM2M Mca
//! reference point. It creates, retrieves, updates and deletes resources on a
//! CSE, with one fixed timeout per request.

mod config;
mod error;

pub use config::McaConfig;
pub use error::McaError;

use onem2m_resource::{decode_auto, encode, merge, Encoding, Resource, WriteMode};
use tracing::{debug, warn};
use uuid::Uuid;

/// A minimal oneM2M Mca client
#[derive(Debug, Clone)]
pub struct McaClient {
    agent: ureq::Agent,
    config: McaConfig,
}

/// A response that passed the status check
struct Reply {
    content_type: Option<String>,
    body: String,
}

impl McaClient {
    /// Create a new client after validating the configuration
    pub fn new(config: McaConfig) -> Result<Self, McaError> {
        config.validate()?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.request_timeout)
            .timeout(config.request_timeout)
            .build();
        Ok(Self { agent, config })
    }

    pub fn config(&self) -> &McaConfig {
        &self.config
    }

    /// Full request URL for a resource id.
    ///
    /// SP-relative ids (leading `/`) map to `<address>/~<id>`, CSE-relative
    /// ids to `<address>/~/<id>`. An id already carrying the `/~` prefix is
    /// used as is.
    pub fn resource_url(&self, id: &str) -> String {
        let address = self.config.address.trim_end_matches('/');
        let id = id.strip_prefix("/~").unwrap_or(id);
        if id.starts_with('/') {
            format!("{}/~{}", address, id)
        } else {
            format!("{}/~/{}", address, id)
        }
    }

    /// Create `resource` under `parent_id` and return it updated with the
    /// attributes assigned by the CSE (`ri`, `ct`, ...)
    pub fn create(&self, parent_id: &str, resource: &Resource) -> Result<Resource, McaError> {
        let body = encode(resource, self.config.encoding, WriteMode::Create)?;
        let content_type = format!(
            "{};ty={}",
            self.config.encoding.mime_type(),
            resource.resource_type().code()
        );
        let reply = self.send("POST", parent_id, Some((&content_type, &body)), 201)?;

        let mut created = resource.clone();
        self.merge_reply(&mut created, &reply)?;

        // Created under a structured path: the child's path follows from it.
        let base = created.base_mut();
        if base.structured_path.is_none() {
            if let (Some(pi), Some(rn)) = (&base.parent_id, &base.resource_name) {
                if cse_relative(pi) != cse_relative(parent_id) {
                    base.structured_path = Some(format!("{}/{}", parent_id.trim_end_matches('/'), rn));
                }
            }
        }
        Ok(created)
    }

    /// Retrieve a resource by id
    pub fn retrieve(&self, id: &str) -> Result<Resource, McaError> {
        let reply = self.send("GET", id, None, 200)?;
        let mut resource = decode_auto(None, reply.content_type.as_deref(), &reply.body)?;
        let by_other_id = resource
            .resource_id()
            .map(|ri| cse_relative(ri) != cse_relative(id));
        let base = resource.base_mut();
        match by_other_id {
            None => base.resource_id = Some(id.to_string()),
            // Retrieved by structured path, which later identifies children.
            Some(true) if base.structured_path.is_none() => {
                base.structured_path = Some(id.to_string());
            }
            Some(_) => {}
        }
        Ok(resource)
    }

    /// Update the writable attributes of an existing resource
    pub fn update(&self, id: &str, resource: &Resource) -> Result<Resource, McaError> {
        let body = encode(resource, self.config.encoding, WriteMode::Update)?;
        let content_type = self.config.encoding.mime_type();
        let reply = self.send("PUT", id, Some((content_type, &body)), 200)?;

        let mut updated = resource.clone();
        self.merge_reply(&mut updated, &reply)?;
        Ok(updated)
    }

    /// Delete a resource by id
    pub fn delete(&self, id: &str) -> Result<(), McaError> {
        self.send("DELETE", id, None, 200).map(|_| ())
    }

    fn merge_reply(&self, resource: &mut Resource, reply: &Reply) -> Result<(), McaError> {
        if reply.body.trim().is_empty() {
            return Ok(());
        }
        let encoding = reply
            .content_type
            .as_deref()
            .and_then(Encoding::from_content_type)
            .or_else(|| Encoding::sniff(&reply.body))
            .unwrap_or(self.config.encoding);
        merge(resource, encoding, &reply.body)?;
        Ok(())
    }

    fn send(
        &self,
        method: &str,
        id: &str,
        body: Option<(&str, &str)>,
        expected_status: u16,
    ) -> Result<Reply, McaError> {
        let url = self.resource_url(id);
        let request_id = Uuid::new_v4().to_string();
        debug!(method, url = %url, request_id = %request_id, "Mca request");

        let request = self
            .agent
            .request(method, &url)
            .set("X-M2M-Origin", &self.config.originator)
            .set("X-M2M-RI", &request_id)
            .set("Accept", self.config.encoding.mime_type());

        let result = match body {
            Some((content_type, payload)) => {
                debug!(body = payload, "Mca request body");
                request.set("Content-Type", content_type).send_string(payload)
            }
            None => request.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!(method, url = %url, code, "Mca request rejected");
                return Err(McaError::Status { code, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(method, url = %url, error = %transport, "Mca request failed");
                return Err(map_transport(transport));
            }
        };

        let status = response.status();
        let content_type = response.header("Content-Type").map(str::to_string);
        let body = response
            .into_string()
            .map_err(|e| McaError::Network(e.to_string()))?;
        debug!(status, body = %body, "Mca response");

        if status != expected_status {
            return Err(McaError::Status { code: status, body });
        }
        Ok(Reply { content_type, body })
    }
}

/// CSE-relative form of an identifier.
///
/// SP-relative ids (`/<cse-id>/<rest>`) lose their CSE-ID segment so both
/// forms of the same id compare equal.
fn cse_relative(id: &str) -> &str {
    let id = id.strip_prefix("/~").unwrap_or(id).trim_end_matches('/');
    match id.strip_prefix('/') {
        Some(rest) => rest.split_once('/').map_or(rest, |(_, tail)| tail),
        None => id,
    }
}

fn map_transport(transport: ureq::Transport) -> McaError {
    let timed_out = std::error::Error::source(&transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });
    if timed_out {
        McaError::Timeout(transport.to_string())
    } else {
        McaError::Network(transport.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use onem2m_resource::{ContentInstance, ResourceType, Subscription};
    use std::net::TcpListener;
    use std::time::Duration;

    fn client(address: &str) -> McaClient {
        McaClient::new(McaConfig::new(address, "admin:admin")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(
            McaClient::new(McaConfig::new("localhost", "admin:admin")),
            Err(McaError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_resource_url() {
        let client = client("http://localhost:8282/");
        assert_eq!(
            client.resource_url("mn-cse/cnt-1"),
            "http://localhost:8282/~/mn-cse/cnt-1"
        );
        assert_eq!(
            client.resource_url("/mn-cse/cnt-1"),
            "http://localhost:8282/~/mn-cse/cnt-1"
        );
        assert_eq!(
            client.resource_url("/mn-cse/mn-name/ae"),
            "http://localhost:8282/~/mn-cse/mn-name/ae"
        );
        assert_eq!(
            client.resource_url("/~/mn-cse/mn-name/app/data"),
            "http://localhost:8282/~/mn-cse/mn-name/app/data"
        );
    }

    #[test]
    fn test_create_sends_typed_content_and_merges_reply() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/~/mn-cse/cnt-5")
            .match_header("x-m2m-origin", "admin:admin")
            .match_header("x-m2m-ri", Matcher::Regex("^[0-9a-f-]{36}$".to_string()))
            .match_header("content-type", "application/json;ty=23")
            .match_body(Matcher::Regex(r#""nu":\["http://localhost:1400"\]"#.to_string()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"m2m:sub":{"ri":"/mn-cse/sub-77","rn":"sub_1","ct":"20260101T120000"}}"#)
            .create();

        let mut sub = Subscription::with_notification_uri(vec!["http://localhost:1400".into()]);
        sub.base.resource_name = Some("sub_1".to_string());
        let created = client(&server.url())
            .create("/mn-cse/cnt-5", &Resource::from(sub))
            .unwrap();

        assert_eq!(created.resource_id(), Some("/mn-cse/sub-77"));
        assert_eq!(created.base().creation_time.as_deref(), Some("20260101T120000"));
        assert_eq!(
            created.as_subscription().unwrap().notification_uri,
            vec!["http://localhost:1400"]
        );
        mock.assert();
    }

    #[test]
    fn test_retrieve_decodes_xml_reply() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/~/mn-cse/cin-1")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(r#"<m2m:cin xmlns:m2m="http://www.onem2m.org/xml/protocols" rn="cin_1"><ri>cin-1</ri><con>Hello, World</con></m2m:cin>"#)
            .create();

        let resource = client(&server.url()).retrieve("mn-cse/cin-1").unwrap();
        assert_eq!(resource.resource_type(), ResourceType::ContentInstance);
        assert_eq!(
            resource.as_content_instance().and_then(|c| c.content.as_deref()),
            Some("Hello, World")
        );
        assert_eq!(resource.resource_id(), Some("cin-1"));
        assert_eq!(resource.structured_path(), Some("mn-cse/cin-1"));
        mock.assert();
    }

    #[test]
    fn test_retrieve_by_other_form_of_id_is_not_a_path() {
        let mut server = Server::new();
        let _sp = server
            .mock("GET", "/~/mn-cse/cnt-1")
            .with_status(200)
            .with_body(r#"{"m2m:cnt":{"ri":"cnt-1","rn":"data"}}"#)
            .create();
        let _cse = server
            .mock("GET", "/~/cnt-2")
            .with_status(200)
            .with_body(r#"{"m2m:cnt":{"ri":"/mn-cse/cnt-2","rn":"data"}}"#)
            .create();
        let _path = server
            .mock("GET", "/~/mn-cse/mn-name/app/data")
            .with_status(200)
            .with_body(r#"{"m2m:cnt":{"ri":"/mn-cse/cnt-3","rn":"data"}}"#)
            .create();

        let client = client(&server.url());
        assert!(client.retrieve("/mn-cse/cnt-1").unwrap().structured_path().is_none());
        assert!(client.retrieve("cnt-2").unwrap().structured_path().is_none());
        assert_eq!(
            client.retrieve("/mn-cse/mn-name/app/data").unwrap().structured_path(),
            Some("/mn-cse/mn-name/app/data")
        );
    }

    #[test]
    fn test_create_under_structured_path_records_child_path() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/~/mn-name/app/data")
            .with_status(201)
            .with_body(r#"{"m2m:sub":{"ri":"/mn-cse/sub-9","rn":"sub_9","pi":"/mn-cse/cnt-1"}}"#)
            .create();
        let _by_id = server
            .mock("POST", "/~/mn-cse/cnt-1")
            .with_status(201)
            .with_body(r#"{"m2m:sub":{"ri":"/mn-cse/sub-10","rn":"sub_10","pi":"cnt-1"}}"#)
            .create();

        let client = client(&server.url());
        let sub = Resource::from(Subscription::with_notification_uri(vec!["http://localhost:1400".into()]));

        let created = client.create("mn-name/app/data", &sub).unwrap();
        assert_eq!(created.structured_path(), Some("mn-name/app/data/sub_9"));

        let created = client.create("/mn-cse/cnt-1", &sub).unwrap();
        assert!(created.structured_path().is_none());
    }

    #[test]
    fn test_cse_relative() {
        assert_eq!(cse_relative("/mn-cse/cnt-1"), "cnt-1");
        assert_eq!(cse_relative("cnt-1"), "cnt-1");
        assert_eq!(cse_relative("/mn-cse"), "mn-cse");
        assert_eq!(cse_relative("/mn-cse/mn-name/app/"), "mn-name/app");
        assert_eq!(cse_relative("/~/mn-cse/cnt-1"), "cnt-1");
    }

    #[test]
    fn test_update_sends_writable_attributes_and_merges_reply() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/~/mn-cse/cnt-1")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJsonString(r#"{"m2m:cnt":{"mni":10}}"#.to_string()))
            .with_status(200)
            .with_body(r#"{"m2m:cnt":{"ri":"/mn-cse/cnt-1","lt":"20260101T130000"}}"#)
            .create();

        let mut cnt = onem2m_resource::Container::default();
        cnt.base.resource_name = Some("data".to_string());
        cnt.max_nr_of_instances = Some(10);
        let updated = client(&server.url())
            .update("/mn-cse/cnt-1", &Resource::from(cnt))
            .unwrap();

        assert_eq!(updated.base().last_modified_time.as_deref(), Some("20260101T130000"));
        mock.assert();
    }

    #[test]
    fn test_unexpected_status_is_reported() {
        let mut server = Server::new();
        let mock = server
            .mock("DELETE", "/~/mn-cse/sub-1")
            .with_status(404)
            .with_body("resource does not exist")
            .create();

        match client(&server.url()).delete("/mn-cse/sub-1") {
            Err(McaError::Status { code, body }) => {
                assert_eq!(code, 404);
                assert_eq!(body, "resource does not exist");
            }
            other => panic!("Expected McaError::Status, got {:?}", other),
        }
        mock.assert();
    }

    #[test]
    fn test_success_with_wrong_code_is_reported() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/~/cnt-1")
            .with_status(200)
            .with_body("{}")
            .create();
        let cin = Resource::from(ContentInstance::with_content("42"));

        assert!(matches!(
            client(&server.url()).create("cnt-1", &cin),
            Err(McaError::Status { code: 200, .. })
        ));
    }

    #[test]
    fn test_unreachable_cse_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = McaConfig::new(format!("http://127.0.0.1:{}", port), "admin:admin")
            .with_request_timeout(Duration::from_secs(2));
        let client = McaClient::new(config).unwrap();

        assert!(matches!(
            client.delete("cnt-1"),
            Err(McaError::Network(_)) | Err(McaError::Timeout(_))
        ));
    }
}
