//! Filesystem subscriptions
//!
//! A subscription watches one working tree recursively and pushes
//! [`Event::FilesystemChange`] into the reactor queue. Changes inside `.git/`
//! only count when they touch `HEAD`, `index` or `refs/`, the files that move
//! when someone commits, stages, or switches branches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::reactor::{Event, EventSender};

/// Creates filesystem subscriptions
pub trait Subscriber: Send {
    /// Start watching `root` on behalf of `target`
    fn subscribe(&self, target: &str, root: &Path) -> Result<Box<dyn Subscription>>;
}

/// A live OS watch; dropping it removes the watch
pub trait Subscription: Send {
    fn root(&self) -> &Path;

    /// The reactor handled the queued change event, allow the next one
    fn acknowledge(&self);
}

/// Subscriber backed by the platform's recommended `notify` watcher
pub struct NotifySubscriber {
    events: EventSender,
}

impl NotifySubscriber {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl Subscriber for NotifySubscriber {
    fn subscribe(&self, target: &str, root: &Path) -> Result<Box<dyn Subscription>> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        debug!(%target, ?root, "NotifySubscriber::subscribe: called");

        let git_dir = root.join(".git");
        let pending = Arc::new(AtomicBool::new(false));
        let callback_pending = Arc::clone(&pending);
        let events = self.events.clone();
        let target = target.to_string();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Filesystem watch error");
                    return;
                }
            };
            if !is_relevant(&event, &git_dir) {
                trace!(?event, "Ignoring filesystem event");
                return;
            }
            // One queued change per subscription until the reactor acknowledges it
            if callback_pending.swap(true, Ordering::AcqRel) {
                return;
            }
            if events.send(Event::FilesystemChange(target.clone())).is_err() {
                debug!("Filesystem watch: event queue closed");
            }
        })
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .context(format!("Failed to watch {}", root.display()))?;

        Ok(Box::new(NotifySubscription {
            _watcher: watcher,
            root,
            pending,
        }))
    }
}

struct NotifySubscription {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    pending: Arc<AtomicBool>,
}

impl Subscription for NotifySubscription {
    fn root(&self) -> &Path {
        &self.root
    }

    fn acknowledge(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Drop for NotifySubscription {
    fn drop(&mut self) {
        debug!(root = ?self.root, "NotifySubscription: removing watch");
    }
}

/// Whether an event can change what `git status` reports
fn is_relevant(event: &notify::Event, git_dir: &Path) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| match path.strip_prefix(git_dir) {
        Ok(rel) => rel == Path::new("HEAD") || rel == Path::new("index") || rel.starts_with("refs"),
        Err(_) => true,
    })
}
