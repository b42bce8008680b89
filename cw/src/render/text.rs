//! Plain-text renderer
//!
//! Writes each new display state as a block of lines. Used by the one-shot
//! commands and by `watch --plain` when no terminal UI is wanted.

use std::io::Write;

use chrono::Utc;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::debug;

use super::{Renderer, ViewLine, view_lines};
use crate::reactor::DisplayState;
use crate::status::FileState;

pub struct TextRenderer<W: Write + Send> {
    out: W,
    color: bool,
    last: Option<DisplayState>,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        debug!(color, "TextRenderer::new: called");
        Self { out, color, last: None }
    }

    /// Write lines as-is, outside the state-driven flow
    pub fn print(&mut self, lines: &[ViewLine]) -> Result<()> {
        for line in lines {
            let text = if self.color { styled(line) } else { line.to_string() };
            writeln!(self.out, "{}", text).context("Failed to write output")?;
        }
        self.out.flush().context("Failed to flush output")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn render(&mut self, state: &DisplayState) -> Result<()> {
        // Ticks re-render identical states; only print changes
        if self.last.as_ref() == Some(state) {
            return Ok(());
        }
        if self.last.is_some() {
            writeln!(self.out).context("Failed to write output")?;
        }
        self.print(&view_lines(state, Utc::now()))?;
        self.last = Some(state.clone());
        Ok(())
    }
}

fn styled(line: &ViewLine) -> String {
    match line {
        ViewLine::Welcome => line.to_string().green().bold().to_string(),
        ViewLine::Hint(_) | ViewLine::Empty(_) => line.to_string().dimmed().to_string(),
        ViewLine::Target(_) | ViewLine::Heading(_) => line.to_string().cyan().bold().to_string(),
        ViewLine::Warning(_) => line.to_string().yellow().bold().to_string(),
        ViewLine::Reason(_) => line.to_string().yellow().to_string(),
        ViewLine::File { path, state } => {
            let label = format!("{:<10}", state.to_string());
            let label = match state {
                FileState::Added => label.green(),
                FileState::Deleted | FileState::Conflicted => label.red(),
                FileState::Untracked => label.dimmed(),
                _ => label.yellow(),
            };
            format!("  {} {}", label, path)
        }
        ViewLine::Branch(name) => format!("  {}", name.magenta()),
        ViewLine::Commit {
            short_id,
            summary,
            age,
            author,
        } => {
            let summary = match summary.split_once(':') {
                Some((kind, rest)) => format!("{}:{}", kind.green().underline(), rest),
                None => summary.green().to_string(),
            };
            format!(
                "  {} - {} {} {}",
                short_id.yellow(),
                summary,
                format!("({})", age).blue(),
                format!("[{}]", author).dimmed()
            )
        }
    }
}
