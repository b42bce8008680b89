//! Rendering
//!
//! [`view_lines`] turns a [`DisplayState`] into a flat list of [`ViewLine`]s.
//! Renderers only decide how each kind of line looks: the plain-text renderer
//! writes them with ANSI colors, the terminal renderer lays them out in a
//! ratatui frame.

mod text;

pub use text::TextRenderer;

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::reactor::DisplayState;
use crate::status::{CommitSummary, FileEntry, FileState, RepoStatus};

/// Shown while nothing has been announced
pub const WELCOME: &str = "Welcome to commitwatch!";

/// Draws display states
pub trait Renderer: Send {
    fn render(&mut self, state: &DisplayState) -> eyre::Result<()>;
}

/// Sections a repository view is split into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Files,
    Branches,
    Commits,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Files => "Files",
            Self::Branches => "Branches",
            Self::Commits => "Commits",
        };
        write!(f, "{}", label)
    }
}

/// One line of output, tagged with what it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewLine {
    Welcome,
    Hint(String),
    Target(String),
    Warning(String),
    Reason(String),
    Heading(Section),
    File { path: String, state: FileState },
    Branch(String),
    Commit {
        short_id: String,
        summary: String,
        age: String,
        author: String,
    },
    /// Placeholder for a section with nothing in it
    Empty(Section),
}

impl fmt::Display for ViewLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => write!(f, "{}", WELCOME),
            Self::Hint(text) | Self::Reason(text) => write!(f, "{}", text),
            Self::Target(path) => write!(f, "Watching {}", path),
            Self::Warning(path) => write!(f, "Cannot watch {}", path),
            Self::Heading(section) => write!(f, "{}", section),
            Self::File { path, state } => write!(f, "  {:<10} {}", state.to_string(), path),
            Self::Branch(name) => write!(f, "  {}", name),
            Self::Commit {
                short_id,
                summary,
                age,
                author,
            } => write!(f, "  {} - {} ({}) [{}]", short_id, summary, age, author),
            Self::Empty(Section::Files) => write!(f, "  (clean)"),
            Self::Empty(_) => write!(f, "  (none)"),
        }
    }
}

/// Lay out a display state as of `now`
pub fn view_lines(state: &DisplayState, now: DateTime<Utc>) -> Vec<ViewLine> {
    trace!(target = ?state.target(), "view_lines: called");
    match state {
        DisplayState::Idle => vec![
            ViewLine::Welcome,
            ViewLine::Hint("Waiting for a path: commitwatch notify <path>".to_string()),
        ],
        DisplayState::Unwatchable { target, reason } => {
            vec![ViewLine::Warning(target.clone()), ViewLine::Reason(reason.clone())]
        }
        DisplayState::Watching { target, status } => {
            let mut lines = vec![ViewLine::Target(target.clone())];
            lines.extend(status_lines(status, now));
            lines
        }
    }
}

/// Files, branches and commits sections of a status
pub fn status_lines(status: &RepoStatus, now: DateTime<Utc>) -> Vec<ViewLine> {
    let mut lines = vec![ViewLine::Heading(Section::Files)];
    if status.files.is_empty() {
        lines.push(ViewLine::Empty(Section::Files));
    }
    lines.extend(status.files.iter().map(file_line));

    lines.push(ViewLine::Heading(Section::Branches));
    if status.branches.is_empty() {
        lines.push(ViewLine::Empty(Section::Branches));
    }
    lines.extend(status.branches.iter().cloned().map(ViewLine::Branch));

    lines.extend(commit_lines(&status.commits, now));
    lines
}

/// Commits section only
pub fn commit_lines(commits: &[CommitSummary], now: DateTime<Utc>) -> Vec<ViewLine> {
    let mut lines = vec![ViewLine::Heading(Section::Commits)];
    if commits.is_empty() {
        lines.push(ViewLine::Empty(Section::Commits));
    }
    lines.extend(commits.iter().map(|commit| commit_line(commit, now)));
    lines
}

fn file_line(entry: &FileEntry) -> ViewLine {
    ViewLine::File {
        path: entry.path.clone(),
        state: entry.state,
    }
}

/// Commit line with the summary collapsed onto one line
pub fn commit_line(commit: &CommitSummary, now: DateTime<Utc>) -> ViewLine {
    ViewLine::Commit {
        short_id: commit.short_id.clone(),
        summary: commit.summary.split_whitespace().collect::<Vec<_>>().join(" "),
        age: relative_age(commit.time, now),
        author: commit.author.clone(),
    }
}

/// Coarse age of `then`: the largest whole unit of days, hours or minutes,
/// otherwise "N seconds ago"
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - then).max(chrono::TimeDelta::zero());
    let days = elapsed.num_days();
    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes();

    if days > 0 {
        format!("{} days", days)
    } else if hours > 0 {
        format!("{} hours", hours)
    } else if minutes > 0 {
        format!("{} minutes", minutes)
    } else {
        format!("{} seconds ago", elapsed.num_seconds())
    }
}
