//! Repository status collaborator
//!
//! The reactor only needs one operation from a repository: "what does it look
//! like now". [`StatusProvider`] opens a [`StatusHandle`] for a path, and the
//! handle recomputes [`RepoStatus`] on demand.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

mod git;

pub use git::GitStatusProvider;

/// Number of commits shown when nothing else is configured
pub const DEFAULT_MAX_COMMITS: usize = 20;

/// Errors from opening or reading a repository
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("{path} is not a Git repository")]
    NotARepository { path: String },

    #[error("{path} is a bare repository with no working tree")]
    BareRepository { path: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

/// Opens status handles for announced paths
pub trait StatusProvider: Send + Sync {
    /// Open a handle bound to `path`, failing if it is not a trackable repository
    fn open(&self, path: &str) -> Result<Box<dyn StatusHandle>, StatusError>;
}

/// An open repository that can recompute its status
pub trait StatusHandle: Send {
    /// Working tree root, the directory a filesystem subscription covers
    fn root(&self) -> &Path;

    /// Compute files, branches and the newest `max_commits` commits
    fn status(&self, max_commits: usize) -> Result<RepoStatus, StatusError>;
}

/// Snapshot of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    pub files: Vec<FileEntry>,
    pub branches: Vec<String>,
    pub commits: Vec<CommitSummary>,
}

/// A changed path in the working tree or index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub state: FileState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Modified,
    Added,
    Deleted,
    Renamed,
    Typechange,
    Untracked,
    Conflicted,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Modified => "Modified",
            Self::Added => "Added",
            Self::Deleted => "Deleted",
            Self::Renamed => "Renamed",
            Self::Typechange => "Typechange",
            Self::Untracked => "Untracked",
            Self::Conflicted => "Conflicted",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// First 7 hex digits of the commit id
    pub short_id: String,
    pub summary: String,
    pub author: String,
    pub time: DateTime<Utc>,
}
