//! Subscribe - prints every new content instance of a container
//!
//! Retrieves a container from a CSE, subscribes to it and prints the content
//! of each notification for a while, then cleans up.
//!
//! Run with:
//! cargo run -p onem2m-sdk-notify --example subscribe -- http://localhost:8080 /mn-cse/mn-name/app/data
//!
//! `ONEM2M_NOTIFY_HOST` must be an address the CSE can reach.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mca_client::{McaClient, McaConfig};
use onem2m_notify::logging::{init_logging, LoggingMode};
use onem2m_notify::{NotificationConfig, NotificationService, Resource};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingMode::Development)?;

    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| "http://localhost:8080".to_string());
    let container_id = args.next().unwrap_or_else(|| "/mn-cse/mn-name/app/data".to_string());
    let originator = std::env::var("ONEM2M_ORIGINATOR").unwrap_or_else(|_| "Cadmin".to_string());

    println!("=== oneM2M Subscribe ===\n");

    let client = McaClient::new(McaConfig::new(address.clone(), originator))?;
    let container = client.retrieve(&container_id)?;
    println!("Retrieved {} from {}", container.resource_type(), address);

    let service = NotificationService::new(NotificationConfig::from_env()?, Arc::new(client));
    service.setup(Some(Arc::new(|resource: Resource| {
        match resource.as_content_instance().and_then(|cin| cin.content.as_deref()) {
            Some(content) => println!("New content: {}", content),
            None => println!("Changed: {}", resource.resource_type()),
        }
    })))?;
    println!(
        "Listening on {}",
        service.listen_address().unwrap_or_default()
    );

    if !service.subscribe(&container, None)? {
        println!("The CSE did not accept the subscription");
        return Ok(());
    }
    println!("Subscribed to {}; waiting 60 seconds for notifications...\n", container_id);

    thread::sleep(Duration::from_secs(60));

    service.shutdown()?;
    println!("\nUnsubscribed and stopped");
    Ok(())
}
