//! Test doubles and fixtures shared by unit and integration tests
//!
//! Fake collaborators count live resources so tests can check the "at most one
//! subscription, at most one handle" invariants directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use git2::{Commit, Repository, Signature};

use crate::reactor::DisplayState;
use crate::render::Renderer;
use crate::status::{RepoStatus, StatusError, StatusHandle, StatusProvider};
use crate::watch::{Subscriber, Subscription};

/// Create a repository with a test identity
pub fn init_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).expect("test setup failed");
    {
        let mut config = repo.config().expect("test setup failed");
        config.set_str("user.name", "Test User").expect("test setup failed");
        config.set_str("user.email", "test@example.com").expect("test setup failed");
    }
    repo
}

/// Write `name`, stage it and commit on HEAD
pub fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) {
    let root = repo.workdir().expect("test setup failed");
    std::fs::write(root.join(name), content).expect("test setup failed");

    let mut index = repo.index().expect("test setup failed");
    index.add_path(Path::new(name)).expect("test setup failed");
    index.write().expect("test setup failed");
    let tree_id = index.write_tree().expect("test setup failed");
    let tree = repo.find_tree(tree_id).expect("test setup failed");

    let sig = Signature::now("Test User", "test@example.com").expect("test setup failed");
    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("test setup failed")],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .expect("test setup failed");
}

/// In-memory status provider
///
/// Paths registered with [`FakeStatusProvider::set_status`] open successfully,
/// everything else is "not a repository". Status can be changed or broken at any
/// time to simulate the repository changing underneath an open handle.
#[derive(Clone, Default)]
pub struct FakeStatusProvider {
    repos: Arc<Mutex<HashMap<String, RepoStatus>>>,
    open_handles: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl FakeStatusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` a valid repository reporting `status`
    pub fn set_status(&self, path: &str, status: RepoStatus) {
        self.repos.lock().expect("lock poisoned").insert(path.to_string(), status);
    }

    /// Make `path` stop being a repository
    pub fn remove(&self, path: &str) {
        self.repos.lock().expect("lock poisoned").remove(path);
    }

    /// Handles currently alive
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Successful opens so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl StatusProvider for FakeStatusProvider {
    fn open(&self, path: &str) -> Result<Box<dyn StatusHandle>, StatusError> {
        if !self.repos.lock().expect("lock poisoned").contains_key(path) {
            return Err(StatusError::NotARepository { path: path.to_string() });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            path: path.to_string(),
            root: PathBuf::from(path),
            repos: Arc::clone(&self.repos),
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

struct FakeHandle {
    path: String,
    root: PathBuf,
    repos: Arc<Mutex<HashMap<String, RepoStatus>>>,
    open_handles: Arc<AtomicUsize>,
}

impl StatusHandle for FakeHandle {
    fn root(&self) -> &Path {
        &self.root
    }

    fn status(&self, max_commits: usize) -> Result<RepoStatus, StatusError> {
        let repos = self.repos.lock().expect("lock poisoned");
        let mut status = repos
            .get(&self.path)
            .cloned()
            .ok_or_else(|| StatusError::NotARepository { path: self.path.clone() })?;
        status.commits.truncate(max_commits);
        Ok(status)
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Subscriber that records which targets are subscribed
#[derive(Clone, Default)]
pub struct CountingSubscriber {
    active: Arc<Mutex<Vec<String>>>,
    total: Arc<AtomicUsize>,
}

impl CountingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets with a live subscription
    pub fn active(&self) -> Vec<String> {
        self.active.lock().expect("lock poisoned").clone()
    }

    /// Subscriptions ever created
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Subscriber for CountingSubscriber {
    fn subscribe(&self, target: &str, root: &Path) -> eyre::Result<Box<dyn Subscription>> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.active.lock().expect("lock poisoned").push(target.to_string());
        Ok(Box::new(CountedSubscription {
            target: target.to_string(),
            root: root.to_path_buf(),
            active: Arc::clone(&self.active),
        }))
    }
}

struct CountedSubscription {
    target: String,
    root: PathBuf,
    active: Arc<Mutex<Vec<String>>>,
}

impl Subscription for CountedSubscription {
    fn root(&self) -> &Path {
        &self.root
    }

    fn acknowledge(&self) {}
}

impl Drop for CountedSubscription {
    fn drop(&mut self) {
        let mut active = self.active.lock().expect("lock poisoned");
        if let Some(pos) = active.iter().position(|t| *t == self.target) {
            active.remove(pos);
        }
    }
}

/// Renderer that keeps every state it was asked to draw
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<DisplayState>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<DisplayState> {
        self.frames.lock().expect("lock poisoned").clone()
    }

    pub fn last(&self) -> Option<DisplayState> {
        self.frames.lock().expect("lock poisoned").last().cloned()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, state: &DisplayState) -> eyre::Result<()> {
        self.frames.lock().expect("lock poisoned").push(state.clone());
        Ok(())
    }
}
