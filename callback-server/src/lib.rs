//! HTTP callback server for receiving oneM2M notifications.
//!
//! This crate provides a lightweight HTTP endpoint that a CSE can POST
//! notifications to. It knows nothing about subscriptions or resource
//! types: every POST is acknowledged right away and its raw body is passed
//! on through a channel.
//!
//! # Overview
//!
//! - [`CallbackServer`]: binds a local address and answers every POST with
//!   `200 OK` and `X-M2M-RSC: 2000`.
//! - [`NotificationRouter`]: forwards received bodies to a channel while
//!   dispatch is enabled.
//! - [`NotificationPayload`]: the raw body plus its `Content-Type` and
//!   `X-M2M-RI` headers.
//!
//! Decoding and routing to subscriptions is left to the consuming crate.
//!
//! # Example
//!
//! ```no_run
//! use callback_server::{CallbackServer, NotificationPayload, NotificationRouter};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::ServerError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
//!     let router = NotificationRouter::new(tx);
//!
//!     let addr = callback_server::resolve_listen_address("localhost", 1400)?;
//!     let server = CallbackServer::bind(addr, router).await?;
//!
//!     tokio::spawn(async move {
//!         while let Some(notification) = rx.recv().await {
//!             println!("Notification: {}", notification.body);
//!         }
//!     });
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Private Workspace Crate
//!
//! This crate is intended for internal use within the workspace and is not
//! published to crates.io.

mod error;
pub mod router;
mod server;

pub use error::ServerError;
pub use router::{NotificationPayload, NotificationRouter};
pub use server::{
    resolve_listen_address, CallbackServer, REQUEST_ID_HEADER, RESPONSE_STATUS_HEADER,
    RESPONSE_STATUS_OK,
};
