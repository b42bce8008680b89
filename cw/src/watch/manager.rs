//! Watch manager
//!
//! Owns the single watch target: its status handle and its filesystem
//! subscription live together in one slot, so there is never more than one of
//! each and they are always bound to the same path.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::subscription::{Subscriber, Subscription};
use crate::status::{RepoStatus, StatusError, StatusHandle, StatusProvider};

struct ActiveTarget {
    path: String,
    handle: Box<dyn StatusHandle>,
    subscription: Option<Box<dyn Subscription>>,
}

/// Owner of the current watch target
pub struct WatchManager {
    provider: Arc<dyn StatusProvider>,
    subscriber: Box<dyn Subscriber>,
    active: Option<ActiveTarget>,
    failed: Option<String>,
}

impl WatchManager {
    pub fn new(provider: Arc<dyn StatusProvider>, subscriber: Box<dyn Subscriber>) -> Self {
        Self {
            provider,
            subscriber,
            active: None,
            failed: None,
        }
    }

    /// Make `path` the watch target
    ///
    /// Switching to the current target returns the existing handle. A path that
    /// cannot be opened leaves nothing watched; opening it is retried on the
    /// next switch so a repository created in the meantime is picked up.
    pub fn switch_to(&mut self, path: &str) -> Result<&dyn StatusHandle, StatusError> {
        let unchanged = self.active.as_ref().is_some_and(|active| active.path == path);
        if unchanged {
            debug!(%path, "WatchManager::switch_to: already watching, no-op");
            return self
                .active
                .as_ref()
                .map(|active| active.handle.as_ref())
                .ok_or_else(|| StatusError::NotARepository { path: path.to_string() });
        }

        if self.failed.as_deref() == Some(path) {
            debug!(%path, "WatchManager::switch_to: retrying previously unwatchable path");
        }

        let handle = match self.provider.open(path) {
            Ok(handle) => handle,
            Err(e) => {
                info!(%path, reason = %e, "Path is not watchable");
                self.release(path);
                return Err(e);
            }
        };

        if let Some(previous) = self.active.take() {
            debug!(previous = %previous.path, "WatchManager::switch_to: removing previous subscription");
            drop(previous);
        }

        let subscription = match self.subscriber.subscribe(path, handle.root()) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(%path, error = %e, "Filesystem subscription failed, relying on refresh ticks");
                None
            }
        };

        info!(%path, root = ?handle.root(), "Watching new target");
        self.failed = None;
        let active = self.active.insert(ActiveTarget {
            path: path.to_string(),
            handle,
            subscription,
        });
        Ok(active.handle.as_ref())
    }

    /// Recompute status through the current handle
    pub fn refresh(&self, max_commits: usize) -> Option<Result<RepoStatus, StatusError>> {
        self.active.as_ref().map(|active| active.handle.status(max_commits))
    }

    /// Drop the current target after it became unusable, remembering `path` as failed
    pub fn release(&mut self, path: &str) {
        if let Some(previous) = self.active.take() {
            debug!(previous = %previous.path, "WatchManager::release: dropping target");
        }
        self.failed = Some(path.to_string());
    }

    /// Re-arm change notification on the current subscription
    pub fn acknowledge_change(&self) {
        if let Some(subscription) = self.active.as_ref().and_then(|active| active.subscription.as_ref()) {
            subscription.acknowledge();
        }
    }

    /// Remove any subscription and close the handle
    pub fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            info!(path = %active.path, "WatchManager: tearing down");
        }
        self.failed = None;
    }

    /// Path currently watched
    pub fn target(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.path.as_str())
    }

    /// Last path that failed to open, while nothing is watched
    pub fn failed_target(&self) -> Option<&str> {
        self.failed.as_deref()
    }

    /// Whether the current target has a live filesystem subscription
    pub fn is_subscribed(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.subscription.is_some())
    }
}

impl Drop for WatchManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
