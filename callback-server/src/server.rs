//! HTTP server for receiving oneM2M notifications.

use std::net::{SocketAddr, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};
use warp::http::StatusCode;
use warp::Filter;

use crate::error::ServerError;
use crate::router::{NotificationPayload, NotificationRouter};

/// Response status code header carried by every acknowledgement.
pub const RESPONSE_STATUS_HEADER: &str = "X-M2M-RSC";

/// oneM2M `OK` response status code.
pub const RESPONSE_STATUS_OK: &str = "2000";

/// Request identifier header, echoed back when present.
pub const REQUEST_ID_HEADER: &str = "X-M2M-RI";

/// HTTP callback server for receiving oneM2M notifications.
///
/// The server accepts `POST` on any path and immediately answers `200 OK`
/// with `X-M2M-RSC: 2000`, whatever the body contains. Each body is handed
/// to the [`NotificationRouter`], which forwards it only while dispatch is
/// enabled. Other methods fall through to warp's default rejection.
///
/// # Example
///
/// ```no_run
/// use tokio::sync::mpsc;
/// use callback_server::{CallbackServer, NotificationPayload, NotificationRouter};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
///     let router = NotificationRouter::new(tx);
///
///     let server = CallbackServer::bind("127.0.0.1:1400".parse().unwrap(), router)
///         .await
///         .expect("Failed to start callback server");
///
///     println!("Listening at: {}", server.base_url());
///
///     while let Some(notification) = rx.recv().await {
///         println!("Received {} bytes", notification.body.len());
///     }
/// }
/// ```
pub struct CallbackServer {
    /// The address the server is bound to
    local_addr: SocketAddr,
    /// Router shared with the HTTP handler
    router: NotificationRouter,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the listener and start serving.
    ///
    /// Must be called from within a tokio runtime. A port of 0 lets the OS
    /// pick one; [`local_addr`](Self::local_addr) reports the result.
    pub async fn bind(addr: SocketAddr, router: NotificationRouter) -> Result<Self, ServerError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let routes = notification_route(router.clone());
        let (local_addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(|e| ServerError::Bind {
                addr,
                reason: e.to_string(),
            })?;

        let server_handle = tokio::spawn(server);
        info!(%local_addr, "Callback server listening");

        Ok(Self {
            local_addr,
            router,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Get the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the base URL, `http://<ip>:<port>`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Get a reference to the router.
    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    /// Shutdown the callback server gracefully.
    ///
    /// Sends the shutdown signal and waits for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!(local_addr = %self.local_addr, "Callback server stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

/// Resolve a `host` and `port` pair to one socket address, preferring IPv4.
pub fn resolve_listen_address(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let describe = || format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| ServerError::Resolve(format!("{}: {}", describe(), e)))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ServerError::Resolve(describe()))
}

/// The single route: acknowledge every POST, then hand the body to the router.
fn notification_route(
    router: NotificationRouter,
) -> impl Filter<Extract = (Box<dyn warp::Reply>,), Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::header::optional::<String>("x-m2m-ri"))
        .and(warp::body::bytes())
        .map(
            move |path: warp::path::FullPath,
                  content_type: Option<String>,
                  request_id: Option<String>,
                  body: bytes::Bytes| {
                trace!(path = path.as_str(), bytes = body.len(), "Notification received");

                let payload = NotificationPayload {
                    content_type,
                    request_id: request_id.clone(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                };
                if !router.route(payload) {
                    debug!(path = path.as_str(), "Notification acknowledged but not forwarded");
                }

                acknowledge(request_id)
            },
        )
}

fn acknowledge(request_id: Option<String>) -> Box<dyn warp::Reply> {
    let reply = warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::OK),
        RESPONSE_STATUS_HEADER,
        RESPONSE_STATUS_OK,
    );
    match request_id {
        Some(request_id) => Box::new(warp::reply::with_header(reply, REQUEST_ID_HEADER, request_id)),
        None => Box::new(reply),
    }
}
