//! Background listener thread
//!
//! Spawns a thread with its own tokio runtime that hosts the callback server
//! and dispatches every received payload on the blocking pool, while the
//! service exposes a sync API.

use std::net::SocketAddr;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use callback_server::{CallbackServer, NotificationPayload, NotificationRouter};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{NotificationError, Result};

/// Name of the listener thread
pub const LISTENER_THREAD_NAME: &str = "onem2m-notify-listener";

/// Upper bound on runtime teardown once the dispatch drain is over.
/// Blocking tasks still running at that point are not waited for.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Handle to a running listener thread.
///
/// Dropping the handle stops the listener and joins the thread.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// The address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the server, finish in-flight dispatches and join the thread.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Listener thread panicked");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

/// Start the listener thread and wait until it is bound.
///
/// Returns once the server accepts connections, or with the bind error.
pub fn spawn_listener(
    addr: SocketAddr,
    router: NotificationRouter,
    payload_rx: mpsc::UnboundedReceiver<NotificationPayload>,
    dispatcher: Arc<Dispatcher>,
    drain_timeout: Duration,
) -> Result<ListenerHandle> {
    let (ready_tx, ready_rx) = std_mpsc::channel::<Result<SocketAddr>>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let thread = thread::Builder::new()
        .name(LISTENER_THREAD_NAME.to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime for listener: {}", e);
                    let _ = ready_tx.send(Err(NotificationError::WorkerDisconnected));
                    return;
                }
            };

            rt.block_on(async {
                let server = match CallbackServer::bind(addr, router).await {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(server.local_addr()));

                run_dispatch_loop(server, payload_rx, shutdown_rx, dispatcher, drain_timeout)
                    .await;
            });

            // The drain already waited for callbacks; stragglers are abandoned.
            rt.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
        })
        .map_err(|e| {
            tracing::error!("Failed to spawn listener thread: {}", e);
            NotificationError::WorkerDisconnected
        })?;

    match ready_rx.recv() {
        Ok(Ok(local_addr)) => Ok(ListenerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(NotificationError::WorkerDisconnected)
        }
    }
}

/// Main loop running inside the listener runtime
async fn run_dispatch_loop(
    server: CallbackServer,
    mut payload_rx: mpsc::UnboundedReceiver<NotificationPayload>,
    mut shutdown_rx: oneshot::Receiver<()>,
    dispatcher: Arc<Dispatcher>,
    drain_timeout: Duration,
) {
    let mut tasks: JoinSet<DispatchOutcome> = JoinSet::new();
    tracing::info!(local_addr = %server.local_addr(), "Notification listener started");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("Listener received shutdown signal");
                break;
            }

            payload = payload_rx.recv() => match payload {
                Some(payload) => spawn_dispatch(&mut tasks, &dispatcher, payload),
                None => {
                    tracing::debug!("Payload channel closed");
                    break;
                }
            },

            Some(result) = tasks.join_next(), if !tasks.is_empty() => log_outcome(result),
        }
    }

    server.shutdown().await;

    // Payloads accepted before the server stopped are still dispatched.
    while let Ok(payload) = payload_rx.try_recv() {
        spawn_dispatch(&mut tasks, &dispatcher, payload);
    }

    let drained = tokio::time::timeout(drain_timeout, async {
        while let Some(result) = tasks.join_next().await {
            log_outcome(result);
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(pending = tasks.len(), "Dispatch drain timed out");
        tasks.detach_all();
    }

    tracing::info!("Notification listener shut down");
}

fn spawn_dispatch(
    tasks: &mut JoinSet<DispatchOutcome>,
    dispatcher: &Arc<Dispatcher>,
    payload: NotificationPayload,
) {
    let dispatcher = Arc::clone(dispatcher);
    tasks.spawn_blocking(move || dispatcher.dispatch(&payload));
}

fn log_outcome(result: std::result::Result<DispatchOutcome, tokio::task::JoinError>) {
    match result {
        Ok(outcome) => tracing::trace!(?outcome, "Notification dispatched"),
        Err(e) => tracing::error!("Dispatch task failed: {}", e),
    }
}
