//! Events consumed by the reactor
//!
//! Every producer (transport connections, refresh ticker, filesystem
//! subscription, key input, signal handler) pushes plain values into one
//! unbounded channel. The reactor is the only receiver.

use tokio::sync::mpsc;

/// Queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A directory path announced over the local transport
    PathNotification(String),
    /// Periodic refresh, carries no payload
    RefreshTick,
    /// The filesystem subscription for this target saw a change
    FilesystemChange(String),
    /// User asked to quit, or the process got a termination signal
    CancelRequest,
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the shared event queue
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
