//! Integration tests for the callback server.
//!
//! These tests start a real HTTP server, send actual HTTP requests,
//! and verify end-to-end functionality.

use callback_server::{CallbackServer, NotificationPayload, NotificationRouter};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn start_server() -> (CallbackServer, mpsc::UnboundedReceiver<NotificationPayload>) {
    let (tx, rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind("127.0.0.1:0".parse().unwrap(), NotificationRouter::new(tx))
        .await
        .expect("Failed to create callback server");
    (server, rx)
}

/// A notification is acknowledged and its body reaches the channel unchanged.
#[tokio::test]
async fn test_callback_server_end_to_end() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    let notification = r#"<?xml version="1.0" encoding="UTF-8"?>
<m2m:sgn xmlns:m2m="http://www.onem2m.org/xml/protocols">
    <nev>
        <rep>
            <m2m:cin rn="cin_1"><ty>4</ty><con>Hello, World</con></m2m:cin>
        </rep>
        <rss>1</rss>
    </nev>
    <sur>/mn-cse/sub-1</sur>
</m2m:sgn>"#;

    let response = client
        .post(format!("{}/notify", server.base_url()))
        .header("Content-Type", "application/xml")
        .header("X-M2M-RI", "ri-42")
        .header("X-M2M-Origin", "/mn-cse")
        .body(notification)
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["X-M2M-RSC"], "2000");
    assert_eq!(response.headers()["X-M2M-RI"], "ri-42");

    let payload = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for notification")
        .expect("No notification received");

    assert_eq!(payload.body, notification);
    assert_eq!(payload.content_type.as_deref(), Some("application/xml"));
    assert_eq!(payload.request_id.as_deref(), Some("ri-42"));

    server.shutdown().await;
}

/// Invalid bodies are acknowledged exactly like valid ones.
#[tokio::test]
async fn test_malformed_bodies_are_acknowledged() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    for body in ["", "not a notification", "{\"truncated\": ", "<unclosed"] {
        let response = client
            .post(server.base_url())
            .body(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["X-M2M-RSC"], "2000");
    }

    for _ in 0..4 {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Timeout waiting for notification")
            .expect("No notification received");
    }

    server.shutdown().await;
}

/// Disabling the router stops forwarding but not acknowledging.
#[tokio::test]
async fn test_disabled_router_still_acknowledges() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    server.router().set_enabled(false);

    let response = client
        .post(server.base_url())
        .header("Content-Type", "application/json")
        .body(r#"{"m2m:sgn":{"vrq":true,"sur":"/mn-cse/sub-1"}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["X-M2M-RSC"], "2000");

    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());

    server.router().set_enabled(true);
    client
        .post(server.base_url())
        .body("after enable")
        .send()
        .await
        .unwrap();

    let payload = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for notification")
        .expect("No notification received");
    assert_eq!(payload.body, "after enable");

    server.shutdown().await;
}

/// Methods other than POST are not handled.
#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    let response = client.get(server.base_url()).send().await.unwrap();
    assert_ne!(response.status(), 200);
    assert!(response.headers().get("X-M2M-RSC").is_none());

    let response = client.put(server.base_url()).body("x").send().await.unwrap();
    assert_ne!(response.status(), 200);

    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

/// Many concurrent notifications all arrive.
#[tokio::test]
async fn test_concurrent_notifications() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();
    let base_url = server.base_url();

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let url = base_url.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .header("Content-Type", "application/json")
                .body(format!(r#"{{"m2m:sgn":{{"sur":"sub-{}"}}}}"#, i))
                .send()
                .await
                .map(|r| r.status())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 200);
    }

    let mut bodies = Vec::new();
    for _ in 0..10 {
        let payload = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Timeout waiting for notification")
            .expect("No notification received");
        bodies.push(payload.body);
    }
    for i in 0..10 {
        let expected = format!(r#"{{"m2m:sgn":{{"sur":"sub-{}"}}}}"#, i);
        assert!(bodies.contains(&expected));
    }

    server.shutdown().await;
}

/// After shutdown the port no longer accepts connections.
#[tokio::test]
async fn test_shutdown_releases_port() {
    let (server, _rx) = start_server().await;
    let base_url = server.base_url();
    let addr = server.local_addr();

    server.shutdown().await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    assert!(client.post(base_url).body("late").send().await.is_err());

    let (tx, _rx2) = mpsc::unbounded_channel();
    let rebound = CallbackServer::bind(addr, NotificationRouter::new(tx))
        .await
        .expect("Port should be free after shutdown");
    rebound.shutdown().await;
}
