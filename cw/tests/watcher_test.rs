//! Integration tests for the watcher
//!
//! Drive the real transport, ticker and reactor against fixture repositories,
//! observing the result through a recording renderer.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use commitwatch::ipc::{Endpoint, Transport, WatchClient};
use commitwatch::reactor::{self, DisplayState, Event, EventSender, Reactor};
use commitwatch::status::{FileState, GitStatusProvider, StatusProvider};
use commitwatch::testing::{CountingSubscriber, FakeStatusProvider, RecordingRenderer, commit_file, init_repo};
use commitwatch::ticker::RefreshTicker;
use commitwatch::watch::{NotifySubscriber, Subscriber, WatchManager};
use tempfile::TempDir;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(10);
const TICK: Duration = Duration::from_millis(50);

// =============================================================================
// Helpers
// =============================================================================

struct Watcher {
    endpoint: Endpoint,
    events: EventSender,
    renderer: RecordingRenderer,
    task: JoinHandle<()>,
}

impl Watcher {
    async fn cancel(self) -> Endpoint {
        self.events.send(Event::CancelRequest).unwrap();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("watcher did not stop")
            .unwrap();
        self.endpoint
    }

    async fn notify(&self, path: &Path) -> String {
        WatchClient::new(self.endpoint.clone()).notify(path).await.unwrap()
    }

    async fn wait_for(&self, what: &str, pred: impl Fn(&DisplayState) -> bool) -> DisplayState {
        wait_until(what, || self.renderer.last().filter(|state| pred(state))).await
    }
}

async fn wait_until<T>(what: &str, check: impl Fn() -> Option<T>) -> T {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if let Some(value) = check() {
            return value;
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn start_watcher(
    endpoint: &Endpoint,
    provider: Arc<dyn StatusProvider>,
    subscriber: impl FnOnce(EventSender) -> Box<dyn Subscriber>,
) -> Watcher {
    let (events, mut queue) = reactor::channel();
    let transport = Transport::start(endpoint, events.clone()).await.unwrap();
    let endpoint = transport.endpoint().clone();
    let ticker = RefreshTicker::start(TICK, events.clone());

    let manager = WatchManager::new(provider, subscriber(events.clone()));
    let renderer = RecordingRenderer::new();
    let mut reactor = Reactor::new(manager, renderer.clone(), 20);

    let task = tokio::spawn(async move {
        reactor.run(&mut queue, transport, ticker).await;
    });

    Watcher {
        endpoint,
        events,
        renderer,
        task,
    }
}

async fn start_git_watcher(endpoint: &Endpoint) -> Watcher {
    start_watcher(
        endpoint,
        Arc::new(GitStatusProvider::new().with_search_parents(false)),
        |events| Box::new(NotifySubscriber::new(events)),
    )
    .await
}

fn loopback() -> Endpoint {
    Endpoint::loopback("127.0.0.1:0").unwrap()
}

fn with_timeout<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    async move { tokio::time::timeout(WAIT, fut).await.expect("timed out") }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_starts_idle_with_welcome() {
    let watcher = start_git_watcher(&loopback()).await;

    let state = watcher.wait_for("initial render", |_| true).await;
    assert_eq!(state, DisplayState::Idle);

    // Ticks while idle change nothing
    tokio::time::sleep(TICK * 4).await;
    assert!(watcher.renderer.frames().iter().all(|s| *s == DisplayState::Idle));

    watcher.cancel().await;
}

#[tokio::test]
async fn test_watches_announced_repository() {
    let repo_dir = TempDir::new().unwrap();
    let repo = init_repo(repo_dir.path());
    commit_file(&repo, "README.md", "hello\n", "docs: add readme");
    std::fs::write(repo_dir.path().join("notes.txt"), "draft\n").unwrap();

    let watcher = start_git_watcher(&loopback()).await;
    let announced = watcher.notify(repo_dir.path()).await;

    let state = watcher
        .wait_for("watching", |s| s.is_watching(&announced))
        .await;
    match state {
        DisplayState::Watching { status, .. } => {
            assert_eq!(status.files.len(), 1);
            assert_eq!(status.files[0].path, "notes.txt");
            assert_eq!(status.files[0].state, FileState::Untracked);
            assert_eq!(status.commits.len(), 1);
            assert_eq!(status.commits[0].summary, "docs: add readme");
            assert_eq!(status.branches.len(), 1);
        }
        other => panic!("expected Watching, got {:?}", other),
    }

    watcher.cancel().await;
}

#[tokio::test]
async fn test_working_tree_changes_show_up() {
    let repo_dir = TempDir::new().unwrap();
    let repo = init_repo(repo_dir.path());
    commit_file(&repo, "a.txt", "a\n", "first");

    let watcher = start_git_watcher(&loopback()).await;
    let announced = watcher.notify(repo_dir.path()).await;
    watcher
        .wait_for("clean status", |s| {
            matches!(s, DisplayState::Watching { target, status } if *target == announced && status.files.is_empty())
        })
        .await;

    std::fs::write(repo_dir.path().join("a.txt"), "changed\n").unwrap();

    watcher
        .wait_for("modified file", |s| {
            matches!(s, DisplayState::Watching { status, .. }
                if status.files.iter().any(|f| f.path == "a.txt" && f.state == FileState::Modified))
        })
        .await;

    watcher.cancel().await;
}

#[tokio::test]
async fn test_non_repository_is_unwatchable() {
    let plain_dir = TempDir::new().unwrap();

    let watcher = start_git_watcher(&loopback()).await;
    let announced = watcher.notify(plain_dir.path()).await;

    let state = watcher
        .wait_for("unwatchable", |s| matches!(s, DisplayState::Unwatchable { .. }))
        .await;
    match state {
        DisplayState::Unwatchable { target, reason } => {
            assert_eq!(target, announced);
            assert!(reason.contains(&announced));
        }
        other => panic!("expected Unwatchable, got {:?}", other),
    }

    watcher.cancel().await;
}

#[tokio::test]
async fn test_unwatchable_path_recovers_after_git_init() {
    let dir = TempDir::new().unwrap();

    let watcher = start_git_watcher(&loopback()).await;
    let announced = watcher.notify(dir.path()).await;
    watcher
        .wait_for("unwatchable", |s| matches!(s, DisplayState::Unwatchable { .. }))
        .await;

    init_repo(dir.path());
    watcher.notify(dir.path()).await;
    watcher
        .wait_for("watching after init", |s| s.is_watching(&announced))
        .await;

    watcher.cancel().await;
}

#[tokio::test]
async fn test_switching_keeps_single_subscription() {
    let provider = FakeStatusProvider::new();
    provider.set_status("/repo-a", Default::default());
    provider.set_status("/repo-b", Default::default());
    let subscriber = CountingSubscriber::new();

    let sub = subscriber.clone();
    let watcher = start_watcher(&loopback(), Arc::new(provider.clone()), move |_| Box::new(sub)).await;
    let client = WatchClient::new(watcher.endpoint.clone());

    client.send_raw(b"/repo-a").await.unwrap();
    watcher.wait_for("repo-a", |s| s.is_watching("/repo-a")).await;
    client.send_raw(b"/repo-b\n").await.unwrap();
    watcher.wait_for("repo-b", |s| s.is_watching("/repo-b")).await;

    assert_eq!(subscriber.active(), vec!["/repo-b".to_string()]);
    assert_eq!(provider.open_handles(), 1);

    watcher.cancel().await;
    assert!(subscriber.active().is_empty());
    assert_eq!(provider.open_handles(), 0);
}

#[tokio::test]
async fn test_repeated_notification_causes_no_churn() {
    let provider = FakeStatusProvider::new();
    provider.set_status("/repo", Default::default());
    let subscriber = CountingSubscriber::new();

    let sub = subscriber.clone();
    let watcher = start_watcher(&loopback(), Arc::new(provider.clone()), move |_| Box::new(sub)).await;
    let client = WatchClient::new(watcher.endpoint.clone());

    for _ in 0..3 {
        client.send_raw(b"/repo").await.unwrap();
    }
    wait_until("three notifications rendered", || {
        let frames = watcher.renderer.frames();
        (frames.iter().filter(|s| s.is_watching("/repo")).count() >= 3).then_some(())
    })
    .await;

    assert_eq!(subscriber.total(), 1);
    assert_eq!(provider.opens(), 1);

    watcher.cancel().await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_cancel_releases_socket_for_restart() {
    let temp = TempDir::new().unwrap();
    let socket_path = temp.path().join("commitwatch.sock");
    let endpoint = Endpoint::Unix(socket_path.clone());

    let watcher = start_git_watcher(&endpoint).await;
    assert!(socket_path.exists());
    watcher.cancel().await;
    assert!(!socket_path.exists());

    let again = start_git_watcher(&endpoint).await;
    again.wait_for("initial render", |_| true).await;
    again.cancel().await;
}

#[tokio::test]
async fn test_cancel_releases_tcp_port_for_restart() {
    let watcher = start_git_watcher(&loopback()).await;
    let endpoint = watcher.cancel().await;

    let (events, _queue) = reactor::channel();
    let transport = with_timeout(Transport::start(&endpoint, events)).await.unwrap();
    assert_eq!(transport.endpoint(), &endpoint);
    transport.stop().await;
}

#[tokio::test]
async fn test_notify_without_watcher_fails() {
    let watcher = start_git_watcher(&loopback()).await;
    let endpoint = watcher.cancel().await;

    let err = WatchClient::new(endpoint)
        .with_timeout(Duration::from_secs(2))
        .notify(Path::new("/tmp"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No watcher listening"));
}
