//! Watch target ownership
//!
//! [`WatchManager`] is the only place the watched path changes. It pairs the
//! open status handle with a filesystem subscription from a [`Subscriber`].

mod manager;
mod subscription;

pub use manager::WatchManager;
pub use subscription::{NotifySubscriber, Subscriber, Subscription};
