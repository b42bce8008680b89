//! libgit2-backed status provider

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{BranchType, ErrorCode, Repository, RepositoryOpenFlags, Sort, Status, StatusOptions};
use tracing::debug;

use super::{CommitSummary, FileEntry, FileState, RepoStatus, StatusError, StatusHandle, StatusProvider};

/// Opens repositories with libgit2
#[derive(Debug, Clone)]
pub struct GitStatusProvider {
    search_parents: bool,
}

impl Default for GitStatusProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GitStatusProvider {
    /// A provider that resolves subdirectories to their enclosing repository
    pub fn new() -> Self {
        Self { search_parents: true }
    }

    /// Whether a path inside a repository resolves to that repository
    pub fn with_search_parents(mut self, search_parents: bool) -> Self {
        self.search_parents = search_parents;
        self
    }
}

impl StatusProvider for GitStatusProvider {
    fn open(&self, path: &str) -> Result<Box<dyn StatusHandle>, StatusError> {
        debug!(%path, search_parents = self.search_parents, "GitStatusProvider::open: called");
        let flags = if self.search_parents {
            RepositoryOpenFlags::empty()
        } else {
            RepositoryOpenFlags::NO_SEARCH
        };

        let repo = Repository::open_ext(path, flags, std::iter::empty::<&OsStr>()).map_err(|e| {
            debug!(%path, error = %e, "GitStatusProvider::open: open failed");
            StatusError::NotARepository { path: path.to_string() }
        })?;

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| StatusError::BareRepository { path: path.to_string() })?;
        debug!(%path, ?root, "GitStatusProvider::open: opened repository");

        Ok(Box::new(GitStatusHandle { repo, root }))
    }
}

struct GitStatusHandle {
    repo: Repository,
    root: PathBuf,
}

impl StatusHandle for GitStatusHandle {
    fn root(&self) -> &Path {
        &self.root
    }

    fn status(&self, max_commits: usize) -> Result<RepoStatus, StatusError> {
        Ok(RepoStatus {
            files: self.file_entries()?,
            branches: self.branch_names()?,
            commits: self.recent_commits(max_commits)?,
        })
    }
}

impl GitStatusHandle {
    fn file_entries(&self) -> Result<Vec<FileEntry>, git2::Error> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut files: Vec<FileEntry> = statuses
            .iter()
            .filter_map(|entry| {
                let state = file_state(entry.status())?;
                let path = entry.path()?.to_string();
                Some(FileEntry { path, state })
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn branch_names(&self) -> Result<Vec<String>, git2::Error> {
        let mut branches = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                branches.push(name.to_string());
            }
        }
        branches.sort();
        Ok(branches)
    }

    fn recent_commits(&self, max_commits: usize) -> Result<Vec<CommitSummary>, git2::Error> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                debug!("recent_commits: HEAD is unborn, no commits yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let Some(head_oid) = head.target() else {
            return Ok(Vec::new());
        };

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head_oid)?;

        let mut commits = Vec::with_capacity(max_commits);
        for oid in revwalk.take(max_commits) {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            commits.push(CommitSummary {
                short_id: commit.id().to_string().chars().take(7).collect(),
                summary: commit.summary().unwrap_or_default().to_string(),
                author: author.name().unwrap_or("unknown").to_string(),
                time: DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
            });
        }
        Ok(commits)
    }
}

/// Map libgit2 status bits to one state; the working tree wins over the index
fn file_state(status: Status) -> Option<FileState> {
    if status.is_conflicted() {
        Some(FileState::Conflicted)
    } else if status.is_wt_new() {
        Some(FileState::Untracked)
    } else if status.is_wt_deleted() {
        Some(FileState::Deleted)
    } else if status.is_wt_renamed() {
        Some(FileState::Renamed)
    } else if status.is_wt_typechange() {
        Some(FileState::Typechange)
    } else if status.is_wt_modified() {
        Some(FileState::Modified)
    } else if status.is_index_new() {
        Some(FileState::Added)
    } else if status.is_index_deleted() {
        Some(FileState::Deleted)
    } else if status.is_index_renamed() {
        Some(FileState::Renamed)
    } else if status.is_index_typechange() {
        Some(FileState::Typechange)
    } else if status.is_index_modified() {
        Some(FileState::Modified)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{commit_file, init_repo};
    use tempfile::TempDir;

    fn open(path: &Path) -> Box<dyn StatusHandle> {
        GitStatusProvider::new().open(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_open_non_repository_fails() {
        let temp = TempDir::new().unwrap();
        let provider = GitStatusProvider::new().with_search_parents(false);

        let err = provider.open(temp.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, StatusError::NotARepository { .. }));
    }

    #[test]
    fn test_open_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");

        let err = GitStatusProvider::new().open(missing.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, StatusError::NotARepository { .. }));
    }

    #[test]
    fn test_open_subdirectory_searches_parents() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let sub = temp.path().join("src");
        std::fs::create_dir(&sub).unwrap();

        let handle = open(&sub);
        assert_eq!(
            std::fs::canonicalize(handle.root()).unwrap(),
            std::fs::canonicalize(temp.path()).unwrap()
        );

        let no_search = GitStatusProvider::new().with_search_parents(false);
        assert!(no_search.open(sub.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_open_bare_repository_fails() {
        let temp = TempDir::new().unwrap();
        Repository::init_bare(temp.path()).unwrap();

        let err = GitStatusProvider::new()
            .open(temp.path().to_str().unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, StatusError::BareRepository { .. }));
    }

    #[test]
    fn test_status_of_empty_repository() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());

        let status = open(temp.path()).status(20).unwrap();
        assert!(status.files.is_empty());
        assert!(status.branches.is_empty());
        assert!(status.commits.is_empty());
    }

    #[test]
    fn test_status_lists_changes_sorted() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        commit_file(&repo, "tracked.txt", "one\n", "feat: first");

        std::fs::write(temp.path().join("tracked.txt"), "two\n").unwrap();
        std::fs::write(temp.path().join("b-new.txt"), "new\n").unwrap();
        std::fs::write(temp.path().join("a-new.txt"), "new\n").unwrap();

        let status = open(temp.path()).status(20).unwrap();
        assert_eq!(
            status.files,
            vec![
                FileEntry {
                    path: "a-new.txt".to_string(),
                    state: FileState::Untracked
                },
                FileEntry {
                    path: "b-new.txt".to_string(),
                    state: FileState::Untracked
                },
                FileEntry {
                    path: "tracked.txt".to_string(),
                    state: FileState::Modified
                },
            ]
        );
    }

    #[test]
    fn test_status_reports_staged_and_deleted() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        commit_file(&repo, "gone.txt", "bye\n", "add gone");

        std::fs::remove_file(temp.path().join("gone.txt")).unwrap();
        std::fs::write(temp.path().join("staged.txt"), "hi\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("staged.txt")).unwrap();
        index.write().unwrap();

        let status = open(temp.path()).status(20).unwrap();
        let states: Vec<(&str, FileState)> = status.files.iter().map(|f| (f.path.as_str(), f.state)).collect();
        assert_eq!(
            states,
            vec![("gone.txt", FileState::Deleted), ("staged.txt", FileState::Added)]
        );
    }

    #[test]
    fn test_status_lists_branches_and_commits_newest_first() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        commit_file(&repo, "a.txt", "a\n", "feat: first");
        commit_file(&repo, "b.txt", "b\n", "fix: second\n\nbody text");
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch("feature", &head, false).unwrap();

        let status = open(temp.path()).status(20).unwrap();
        assert_eq!(status.branches.len(), 2);
        assert!(status.branches.contains(&"feature".to_string()));

        assert_eq!(status.commits.len(), 2);
        assert_eq!(status.commits[0].summary, "fix: second");
        assert_eq!(status.commits[1].summary, "feat: first");
        assert_eq!(status.commits[0].author, "Test User");
        assert_eq!(status.commits[0].short_id.len(), 7);
        assert!(head.id().to_string().starts_with(&status.commits[0].short_id));
    }

    #[test]
    fn test_status_limits_commits() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        for i in 0..5 {
            commit_file(&repo, &format!("f{}.txt", i), "x\n", &format!("commit {}", i));
        }

        let status = open(temp.path()).status(3).unwrap();
        assert_eq!(status.commits.len(), 3);
        assert_eq!(status.commits[0].summary, "commit 4");
    }

    #[test]
    fn test_status_reflects_later_changes() {
        let temp = TempDir::new().unwrap();
        let repo = init_repo(temp.path());
        commit_file(&repo, "a.txt", "a\n", "first");
        let handle = open(temp.path());

        assert!(handle.status(20).unwrap().files.is_empty());
        std::fs::write(temp.path().join("a.txt"), "changed\n").unwrap();
        assert_eq!(handle.status(20).unwrap().files.len(), 1);
    }

    #[test]
    fn test_file_state_precedence() {
        assert_eq!(file_state(Status::WT_NEW), Some(FileState::Untracked));
        assert_eq!(
            file_state(Status::INDEX_NEW | Status::WT_MODIFIED),
            Some(FileState::Modified)
        );
        assert_eq!(file_state(Status::INDEX_NEW), Some(FileState::Added));
        assert_eq!(file_state(Status::CONFLICTED | Status::WT_MODIFIED), Some(FileState::Conflicted));
        assert_eq!(file_state(Status::CURRENT), None);
        assert_eq!(file_state(Status::IGNORED), None);
    }
}
