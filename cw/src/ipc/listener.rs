//! IPC listener for the watcher side
//!
//! [`Listener`] hides the platform choice behind `bind`, `accept` and `close`.
//! [`Transport`] runs the accept loop and turns every connection into at most
//! one [`Event::PathNotification`].

use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Endpoint;
use super::messages::read_message;
use crate::reactor::{Event, EventSender};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// An accepted connection, read once and dropped
pub type Connection = Box<dyn AsyncRead + Send + Unpin>;

/// A bound local endpoint
pub enum Listener {
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: std::path::PathBuf,
    },
    Tcp(TcpListener),
}

impl Listener {
    /// Bind the endpoint
    ///
    /// Handles cleanup of stale socket files from previous runs.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self> {
        debug!(%endpoint, "Listener::bind: called");
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
                }

                if path.exists() {
                    remove_stale_socket(path).await?;
                }

                let listener =
                    UnixListener::bind(path).context(format!("Failed to bind IPC socket {}", path.display()))?;
                debug!(?path, "Listener::bind: socket bound successfully");
                Ok(Self::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            Endpoint::Tcp(addr) => {
                let listener = TcpListener::bind(addr)
                    .await
                    .context(format!("Failed to bind IPC address {}", addr))?;
                debug!(%addr, "Listener::bind: address bound successfully");
                Ok(Self::Tcp(listener))
            }
        }
    }

    /// The endpoint actually bound (resolves port 0 for TCP)
    pub fn endpoint(&self) -> Result<Endpoint> {
        match self {
            #[cfg(unix)]
            Self::Unix { path, .. } => Ok(Endpoint::Unix(path.clone())),
            Self::Tcp(listener) => Ok(Endpoint::Tcp(
                listener.local_addr().context("Failed to read bound address")?,
            )),
        }
    }

    /// Wait for the next connection
    pub async fn accept(&self) -> std::io::Result<Connection> {
        match self {
            #[cfg(unix)]
            Self::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                Ok(Box::new(stream))
            }
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                debug!(%peer, "Listener::accept: tcp connection");
                Ok(Box::new(stream))
            }
        }
    }

    /// Close the listener and remove the socket file, if any
    pub fn close(self) {
        match self {
            #[cfg(unix)]
            Self::Unix { listener, path } => {
                drop(listener);
                cleanup_socket(&path);
            }
            Self::Tcp(listener) => drop(listener),
        }
    }
}

/// Remove a socket file left behind by a previous run
///
/// A socket something still accepts on belongs to a running watcher and is
/// left alone.
#[cfg(unix)]
async fn remove_stale_socket(path: &Path) -> Result<()> {
    match tokio::net::UnixStream::connect(path).await {
        Ok(_) => Err(eyre::eyre!(
            "Address in use: a watcher is already running on {}",
            path.display()
        )),
        Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            debug!(?path, "remove_stale_socket: removing stale socket");
            std::fs::remove_file(path).context("Failed to remove stale socket")
        }
        Err(e) => Err(e).context(format!("Failed to check existing socket {}", path.display())),
    }
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Running accept loop on a bound endpoint
pub struct Transport {
    endpoint: Endpoint,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Transport {
    /// Bind `endpoint` and start accepting connections
    ///
    /// Bind failures are returned to the caller; nothing is retried.
    pub async fn start(endpoint: &Endpoint, events: EventSender) -> Result<Self> {
        let listener = Listener::bind(endpoint).await?;
        let endpoint = listener.endpoint()?;
        info!(%endpoint, "Transport listening for path notifications");

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, events, stop_rx));

        Ok(Self {
            endpoint,
            stop_tx: Some(stop_tx),
            task: Some(task),
        })
    }

    /// The bound endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Stop accepting, close the listener and release the address
    pub async fn stop(mut self) {
        debug!(endpoint = %self.endpoint, "Transport::stop: called");
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Transport accept loop ended abnormally");
            self.remove_socket_file();
        }
        info!(endpoint = %self.endpoint, "Transport stopped");
    }

    fn remove_socket_file(&self) {
        match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => cleanup_socket(path),
            Endpoint::Tcp(_) => {}
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!(endpoint = %self.endpoint, "Transport::drop: aborting accept loop");
            task.abort();
            self.remove_socket_file();
        }
    }
}

async fn accept_loop(listener: Listener, events: EventSender, mut stop_rx: oneshot::Receiver<()>) {
    debug!("accept_loop: started");
    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!("accept_loop: stop requested");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    tokio::spawn(handle_connection(conn, events.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "accept_loop: accept failed, continuing");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
    listener.close();
    debug!("accept_loop: listener closed");
}

async fn handle_connection(mut conn: Connection, events: EventSender) {
    match read_message(&mut conn).await {
        Ok(Some(path)) => {
            debug!(%path, "handle_connection: path notification received");
            if events.send(Event::PathNotification(path)).is_err() {
                debug!("handle_connection: event queue closed");
            }
        }
        Ok(None) => debug!("handle_connection: empty message, ignoring"),
        Err(e) => debug!(error = %e, "handle_connection: read failed, dropping connection"),
    }
}
