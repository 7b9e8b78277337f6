//! Git types and parsing helpers

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorKind;

/// Failure of a git operation on one module
#[derive(Debug, Clone, Error)]
pub enum GitError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    MergeConflict(String),

    #[error("Module has uncommitted changes; a commit message is required to push")]
    MissingCommitMessage,

    #[error("{0}")]
    Subprocess(String),

    #[error("{0}")]
    Cancelled(String),
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::NotARepository(_) => ErrorKind::NotARepository,
            GitError::Network(_) => ErrorKind::NetworkError,
            GitError::MergeConflict(_) => ErrorKind::MergeConflict,
            GitError::MissingCommitMessage => ErrorKind::MissingCommitMessage,
            GitError::Subprocess(_) => ErrorKind::SubprocessError,
            GitError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

const CONFLICT_PATTERNS: &[&str] = &[
    "conflict",
    "non-fast-forward",
    "[rejected]",
    "[remote rejected]",
    "not possible to fast-forward",
    "diverging branches",
    "fetch first",
    "unmerged files",
    "would be overwritten by merge",
    "you have not concluded your merge",
];

const NETWORK_PATTERNS: &[&str] = &[
    "could not resolve host",
    "could not read from remote repository",
    "unable to access",
    "connection refused",
    "connection timed out",
    "connection reset",
    "network is unreachable",
    "operation timed out",
    "failed to connect",
    "does not appear to be a git repository",
    "no such remote",
    "no configured push destination",
    "repository not found",
    "authentication failed",
    "permission denied (publickey",
    "host key verification failed",
];

/// Map a failed git command to the error taxonomy using its stderr
pub fn classify_failure(command: &str, output_text: &str, exit_code: i32) -> GitError {
    let text = output_text.trim();
    let message = if text.is_empty() {
        format!("git {} exited with code {}", command, exit_code)
    } else {
        text.to_string()
    };

    let lower = text.to_lowercase();
    if CONFLICT_PATTERNS.iter().any(|p| lower.contains(p)) {
        GitError::MergeConflict(message)
    } else if NETWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
        GitError::Network(message)
    } else {
        GitError::Subprocess(message)
    }
}

/// Summary state of a working tree against its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoState {
    Clean,
    Dirty,
    Ahead,
    Behind,
    Diverged,
}

impl RepoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoState::Clean => "clean",
            RepoState::Dirty => "dirty",
            RepoState::Ahead => "ahead",
            RepoState::Behind => "behind",
            RepoState::Diverged => "diverged",
        }
    }
}

/// Result of the status action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub state: RepoState,
    /// None when HEAD is detached
    pub branch: Option<String>,
    pub remote_url: Option<String>,
    pub changed: usize,
    /// Untracked files
    pub added: usize,
    pub deleted: usize,
    pub ahead: usize,
    pub behind: usize,
    pub has_upstream: bool,
}

impl RepoStatus {
    pub fn is_dirty(&self) -> bool {
        self.changed + self.added + self.deleted > 0
    }

    pub fn summary(&self) -> String {
        let branch = self.branch.as_deref().unwrap_or("(detached)");
        let mut text = format!("{} on {}", self.state.as_str(), branch);
        if self.is_dirty() {
            text.push_str(&format!(
                ": {} changed, {} added, {} deleted",
                self.changed, self.added, self.deleted
            ));
        }
        if self.ahead > 0 || self.behind > 0 {
            text.push_str(&format!(" (ahead {}, behind {})", self.ahead, self.behind));
        }
        text
    }
}

/// Counts from `git status --porcelain -z`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PorcelainCounts {
    pub changed: usize,
    pub added: usize,
    pub deleted: usize,
    /// Untracked paths, in git's order
    pub untracked: Vec<String>,
}

/// Kind of change for one file of a diff report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Modified,
    Added,
}

/// Diff information for a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub file: String,
    pub change_type: ChangeType,
    pub insertions: usize,
    pub deletions: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_binary: bool,
}

/// Uncommitted changes of a module: unstaged, staged and untracked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub files: Vec<FileChange>,
    pub insertions: usize,
    pub deletions: usize,
    pub summary: String,
}

impl DiffReport {
    pub fn from_files(files: Vec<FileChange>) -> Self {
        let insertions = files.iter().map(|f| f.insertions).sum();
        let deletions = files.iter().map(|f| f.deletions).sum();
        let summary = format!("+{} -{} in {} files", insertions, deletions, files.len());
        Self {
            files,
            insertions,
            deletions,
            summary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of the pull action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub branch: Option<String>,
    pub up_to_date: bool,
}

/// Result of the push action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub branch: String,
    pub remote: String,
    /// Short hash of the commit created before pushing, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Parse NUL-delimited output from git commands
pub(super) fn parse_null_delimited(output: &str) -> Vec<&str> {
    output.split('\0').filter(|s| !s.is_empty()).collect()
}

/// Parse `git status --porcelain -z` into change counts.
///
/// Untracked (`??`) entries count as added, anything with a `D` as deleted,
/// everything else as changed. Rename and copy entries carry their source
/// path as a separate record, which is skipped.
pub(super) fn parse_porcelain(output: &str) -> PorcelainCounts {
    let mut counts = PorcelainCounts::default();
    let mut entries = parse_null_delimited(output).into_iter();

    while let Some(entry) = entries.next() {
        if entry.len() < 3 {
            continue;
        }
        let (code, path) = entry.split_at(2);
        let path = &path[1..];

        if code == "??" {
            counts.added += 1;
            counts.untracked.push(path.to_string());
        } else if code == "!!" {
            continue;
        } else if code.contains('D') {
            counts.deleted += 1;
        } else {
            counts.changed += 1;
        }

        if code.contains('R') || code.contains('C') {
            entries.next();
        }
    }

    counts
}

/// Parse git diff --numstat output.
/// Returns tuples of (path, lines_added, lines_removed, is_binary)
pub(super) fn parse_numstat_output(output: &str) -> Vec<(String, usize, usize, bool)> {
    let mut results = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.splitn(3, '\t').collect();
        if parts.len() < 3 {
            continue;
        }

        let (added, removed, is_binary) = if parts[0] == "-" && parts[1] == "-" {
            (0, 0, true)
        } else {
            let added = parts[0].parse().unwrap_or(0);
            let removed = parts[1].parse().unwrap_or(0);
            (added, removed, false)
        };

        let path = parts[2].to_string();
        if !path.is_empty() {
            results.push((path, added, removed, is_binary));
        }
    }

    results
}

/// Parse `git rev-list --left-right --count HEAD...@{u}` into (ahead, behind)
pub(super) fn parse_ahead_behind(output: &str) -> Option<(usize, usize)> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}
