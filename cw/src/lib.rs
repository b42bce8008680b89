//! commitwatch - live Git status for whichever directory was announced last
//!
//! A watcher process listens on a local endpoint for paths. Shell hooks and
//! editors send it the directory the user is working in; the watcher shows
//! that repository's changed files, branches and recent commits and keeps them
//! current until another path arrives.
//!
//! # Architecture
//!
//! Every producer feeds one queue consumed by the [`reactor::Reactor`]:
//!
//! - [`ipc`] - Local transport: accepts path notifications
//! - [`ticker`] - Periodic refresh ticks
//! - [`watch`] - Filesystem subscriptions and the single watch target
//! - [`tui`] - Key handling (quit) and the full-screen view
//!
//! The reactor applies each event to the [`reactor::DisplayState`], asks the
//! [`status`] provider for repository state, and hands the result to a
//! [`render::Renderer`].

pub mod cli;
pub mod config;
pub mod ipc;
pub mod reactor;
pub mod render;
pub mod status;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod ticker;
pub mod tui;
pub mod watch;

// Re-export commonly used types
pub use config::{Config, DisplayConfig, WatchConfig};
pub use ipc::{Endpoint, Transport, WatchClient};
pub use reactor::{DisplayState, Event, Reactor};
pub use render::{Renderer, TextRenderer};
pub use status::{GitStatusProvider, RepoStatus, StatusError, StatusHandle, StatusProvider};
pub use ticker::RefreshTicker;
pub use watch::{NotifySubscriber, WatchManager};
