//! IPC client for announcing paths to a running watcher
//!
//! Fire-and-forget: connect, write the path, close. The watcher never replies.

use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tracing::debug;

use super::Endpoint;
use super::messages::MAX_MESSAGE_SIZE;

/// Default timeout for IPC operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for sending path notifications
#[derive(Debug, Clone)]
pub struct WatchClient {
    endpoint: Endpoint,
    timeout: Duration,
}

impl WatchClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Announce a directory to the watcher
    ///
    /// The path is made absolute when it exists, so the watcher does not depend
    /// on the caller's working directory.
    pub async fn notify(&self, path: &Path) -> Result<String> {
        let announced = match std::fs::canonicalize(path) {
            Ok(abs) => abs.to_string_lossy().into_owned(),
            Err(e) => {
                debug!(?path, error = %e, "WatchClient::notify: canonicalize failed, sending as given");
                path.to_string_lossy().into_owned()
            }
        };

        if announced.len() > MAX_MESSAGE_SIZE {
            return Err(eyre::eyre!(
                "Path is {} bytes, the watcher reads at most {}",
                announced.len(),
                MAX_MESSAGE_SIZE
            ));
        }

        self.send_raw(announced.as_bytes()).await?;
        Ok(announced)
    }

    /// Send raw message bytes in a single write
    pub async fn send_raw(&self, message: &[u8]) -> Result<()> {
        debug!(endpoint = %self.endpoint, bytes = message.len(), "WatchClient::send_raw: called");
        tokio::time::timeout(self.timeout, self.connect_and_write(message))
            .await
            .map_err(|_| eyre::eyre!("Timed out talking to watcher at {}", self.endpoint))?
    }

    async fn connect_and_write(&self, message: &[u8]) -> Result<()> {
        match &self.endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .context(format!("No watcher listening on {}", path.display()))?;
                write_once(stream, message).await
            }
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .context(format!("No watcher listening on {}", addr))?;
                write_once(stream, message).await
            }
        }
    }
}

async fn write_once<S>(mut stream: S, message: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(message).await.context("Failed to write notification")?;
    stream.flush().await.context("Failed to flush notification")?;
    stream.shutdown().await.context("Failed to close connection")?;
    Ok(())
}
