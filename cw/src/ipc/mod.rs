//! Local transport for path notifications
//!
//! Editors, shell hooks and `commitwatch notify` announce a directory by opening a
//! connection to the watcher's endpoint and writing the path. The endpoint is a
//! Unix Domain Socket where the platform has them, and a loopback TCP address
//! everywhere else.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use eyre::{Context, Result};
use tracing::debug;

use crate::config::WatchConfig;

pub mod client;
pub mod listener;
pub mod messages;

pub use client::WatchClient;
pub use listener::{Listener, Transport};
pub use messages::{MAX_MESSAGE_SIZE, normalize_message};

/// Loopback address used on platforms without domain sockets
pub const DEFAULT_TCP_ADDRESS: &str = "127.0.0.1:47913";

/// Address the watcher listens on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem-path-addressed socket
    #[cfg(unix)]
    Unix(PathBuf),
    /// Loopback TCP address
    Tcp(SocketAddr),
}

impl Endpoint {
    /// Pick the platform endpoint, honoring overrides from config
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        debug!(?config.socket_path, %config.tcp_address, "Endpoint::from_config: called");

        #[cfg(unix)]
        {
            let path = config.socket_path.clone().unwrap_or_else(get_socket_path);
            Ok(Self::Unix(path))
        }

        #[cfg(not(unix))]
        {
            Self::loopback(&config.tcp_address).context("Invalid tcp-address")
        }
    }

    /// Parse a loopback address, rejecting anything reachable from other hosts
    pub fn loopback(addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr.parse().context(format!("Invalid address '{}'", addr))?;
        if !addr.ip().is_loopback() {
            return Err(eyre::eyre!("Address {} is not a loopback address", addr));
        }
        Ok(Self::Tcp(addr))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Get the default socket path
///
/// Lives in the runtime dir so it is cleaned up with the user session.
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("commitwatch")
        .join("commitwatch.sock")
}
