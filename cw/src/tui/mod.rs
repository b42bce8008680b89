//! Full-screen terminal view
//!
//! Draws display states with ratatui on the alternate screen. Key handling
//! runs on its own thread (see [`events`]) and only ever produces
//! `CancelRequest`s for the reactor.

mod events;
mod views;

pub use events::{KeyHandler, is_quit_key};

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use eyre::{Context, Result};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, warn};

use crate::reactor::DisplayState;
use crate::render::Renderer;

/// Terminal type alias
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init() -> Result<Tui> {
    debug!("tui::init: called");
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    undo_on_error(execute!(stdout, EnterAlternateScreen), disable_raw_mode)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Run `undo` when `result` is an error, keeping the original error
fn undo_on_error<T>(result: io::Result<T>, undo: impl FnOnce() -> io::Result<()>) -> io::Result<T> {
    if result.is_err()
        && let Err(e) = undo()
    {
        warn!(error = %e, "Failed to undo terminal setup");
    }
    result
}

/// Restore the terminal to normal mode
pub fn restore() -> Result<()> {
    debug!("tui::restore: called");
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Restores the terminal when dropped, including on early return or panic unwind
pub struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = restore() {
            warn!(error = %e, "Failed to restore terminal");
        }
    }
}

/// Renderer drawing into the terminal
pub struct TerminalRenderer {
    terminal: Tui,
}

impl TerminalRenderer {
    pub fn new(terminal: Tui) -> Self {
        Self { terminal }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, state: &DisplayState) -> Result<()> {
        self.terminal
            .draw(|frame| views::render(state, frame))
            .context("Failed to draw terminal frame")?;
        Ok(())
    }
}
