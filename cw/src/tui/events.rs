//! Key handling for the terminal view
//!
//! crossterm's event reads block, so polling happens on a plain thread. A quit
//! key becomes a `CancelRequest` on the reactor queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};

use crate::reactor::{Event, EventSender};

/// How long one poll waits before re-checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whether a key press asks the watcher to quit: `q`, `Esc` or `Ctrl-C`
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Background key poller
pub struct KeyHandler {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl KeyHandler {
    /// Start polling keys, sending `CancelRequest` on a quit key
    pub fn spawn(events: EventSender) -> Self {
        debug!("KeyHandler::spawn: called");
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::spawn(move || {
            debug!("KeyHandler: polling thread started");
            while !thread_stop.load(Ordering::Acquire) && !events.is_closed() {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        warn!(error = %e, "KeyHandler: poll failed, stopping key handling");
                        break;
                    }
                }
                let Ok(event::Event::Key(key)) = event::read() else {
                    continue;
                };
                if is_quit_key(&key) {
                    debug!(?key, "KeyHandler: quit key pressed");
                    let _ = events.send(Event::CancelRequest);
                    break;
                }
            }
            debug!("KeyHandler: polling thread exiting");
        });

        Self {
            stop,
            thread: Some(thread),
        }
    }

    /// Stop polling and wait for the thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("KeyHandler: polling thread panicked");
        }
    }
}

impl Drop for KeyHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
