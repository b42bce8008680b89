//! View reactor
//!
//! The single consumer of the event queue. Each event goes through one
//! transition `(DisplayState, Event) -> DisplayState`, followed by one render.
//! All watch state is mutated here and nowhere else, so none of it is locked.
//!
//! ```text
//!   Idle ──path──▶ Watching ◀──path──▶ Unwatchable
//!                    │  ▲                   ▲
//!                    │  └── tick/fs change  │
//!                    └──── refresh fails ───┘
//! ```
//!
//! `CancelRequest` leaves the machine from any state.

mod event;
mod state;

pub use event::{Event, EventReceiver, EventSender, channel};
pub use state::DisplayState;

use tracing::{debug, info, trace, warn};

use crate::ipc::Transport;
use crate::render::Renderer;
use crate::status::{DEFAULT_MAX_COMMITS, RepoStatus};
use crate::ticker::RefreshTicker;
use crate::watch::WatchManager;

/// Whether the reactor keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Applies events to the display state and renders the result
pub struct Reactor<R: Renderer> {
    state: DisplayState,
    manager: WatchManager,
    renderer: R,
    max_commits: usize,
}

impl<R: Renderer> Reactor<R> {
    /// Create a reactor in the `Idle` state
    ///
    /// A `max_commits` of 0 falls back to [`DEFAULT_MAX_COMMITS`].
    pub fn new(manager: WatchManager, renderer: R, max_commits: usize) -> Self {
        let max_commits = if max_commits == 0 { DEFAULT_MAX_COMMITS } else { max_commits };
        Self {
            state: DisplayState::Idle,
            manager,
            renderer,
            max_commits,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn manager(&self) -> &WatchManager {
        &self.manager
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Drain the queue until cancelled, then shut every producer down
    ///
    /// Renders the initial `Idle` state before the first event.
    pub async fn run(&mut self, events: &mut EventReceiver, transport: Transport, ticker: RefreshTicker) {
        info!(endpoint = %transport.endpoint(), interval = ?ticker.interval(), "Reactor started");
        self.render();

        while let Some(event) = events.recv().await {
            if self.handle(event) == Flow::Stop {
                break;
            }
        }

        transport.stop().await;
        ticker.stop();
        self.manager.teardown();
        info!("Reactor stopped");
    }

    /// Apply one event and render the resulting state
    pub fn handle(&mut self, event: Event) -> Flow {
        if event == Event::CancelRequest {
            info!(state = ?self.state.target(), "Reactor: cancel requested");
            return Flow::Stop;
        }

        trace!(?event, "Reactor::handle: event");
        let previous = std::mem::take(&mut self.state);
        self.state = self.transition(previous, event);
        self.render();
        Flow::Continue
    }

    fn transition(&mut self, state: DisplayState, event: Event) -> DisplayState {
        match (state, event) {
            (state, Event::PathNotification(path)) if state.is_watching(&path) => {
                debug!(%path, "Reactor: already watching, ignoring notification");
                state
            }
            (_, Event::PathNotification(path)) => self.switch(path),
            (DisplayState::Watching { target, status }, Event::RefreshTick) => self.refresh(target, status),
            (DisplayState::Watching { target, status }, Event::FilesystemChange(changed)) if changed == target => {
                self.manager.acknowledge_change();
                self.refresh(target, status)
            }
            (state, Event::FilesystemChange(changed)) => {
                debug!(%changed, "Reactor: change event for a target no longer watched");
                state
            }
            (state, Event::RefreshTick | Event::CancelRequest) => state,
        }
    }

    fn switch(&mut self, path: String) -> DisplayState {
        debug!(%path, "Reactor::switch: called");
        let max_commits = self.max_commits;
        let result = self
            .manager
            .switch_to(&path)
            .and_then(|handle| handle.status(max_commits));

        match result {
            Ok(status) => DisplayState::Watching { target: path, status },
            Err(e) => {
                if self.manager.target() == Some(path.as_str()) {
                    // Opened, but the first status read failed
                    self.manager.release(&path);
                }
                DisplayState::Unwatchable {
                    target: path,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn refresh(&mut self, target: String, previous: RepoStatus) -> DisplayState {
        match self.manager.refresh(self.max_commits) {
            Some(Ok(status)) => {
                if status != previous {
                    debug!(%target, "Reactor::refresh: status changed");
                }
                DisplayState::Watching { target, status }
            }
            Some(Err(e)) => {
                warn!(%target, error = %e, "Refresh failed, target is no longer watchable");
                self.manager.release(&target);
                DisplayState::Unwatchable {
                    target,
                    reason: e.to_string(),
                }
            }
            None => {
                warn!(%target, "Reactor::refresh: no open handle while watching");
                DisplayState::Watching {
                    target,
                    status: previous,
                }
            }
        }
    }

    fn render(&mut self) {
        if let Err(e) = self.renderer.render(&self.state) {
            warn!(error = %e, "Render failed");
        }
    }
}
