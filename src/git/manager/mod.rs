//! Git manager implementation

mod changes;
mod diff;
mod types;


pub use types::{
    ChangeType, DiffReport, FileChange, GitError, PullReport, PushReport, RepoState, RepoStatus,
    classify_failure,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::runner::{GitOutput, GitRunError, GitRunner};
use types::{parse_ahead_behind, parse_porcelain};

/// Git operations on one module's repository
#[derive(Clone)]
pub struct GitManager {
    /// Root directory of the repository
    root: PathBuf,

    runner: Arc<dyn GitRunner>,
}

impl GitManager {
    /// Create a new Git manager. Fails when `root` has no `.git` entry.
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn GitRunner>) -> Result<Self, GitError> {
        let root = root.into();

        if !root.join(".git").exists() {
            return Err(GitError::NotARepository(root));
        }

        Ok(Self { root, runner })
    }

    /// Like [`GitManager::new`], but also asks git for the working tree top
    /// level and rejects anything that does not resolve to `root` itself.
    pub async fn open(root: impl Into<PathBuf>, runner: Arc<dyn GitRunner>) -> Result<Self, GitError> {
        let manager = Self::new(root, runner)?;

        let output = manager.git_checked(&["rev-parse", "--show-toplevel"]).await?;
        let toplevel = PathBuf::from(output.stdout.trim());
        let expected = std::fs::canonicalize(&manager.root).unwrap_or_else(|_| manager.root.clone());
        let actual = std::fs::canonicalize(&toplevel).unwrap_or(toplevel);

        if actual != expected {
            debug!(
                "{} resolves to repository {}",
                manager.root.display(),
                actual.display()
            );
            return Err(GitError::NotARepository(manager.root));
        }

        Ok(manager)
    }

    /// Run git, mapping spawn failures and timeouts onto the taxonomy.
    /// A non-zero exit is returned as output, not as an error.
    pub(super) async fn git(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.runner
            .run_git(&self.root, args)
            .await
            .map_err(|e| {
                let remote_timeout = matches!(
                    &e,
                    GitRunError::Timeout { command, .. }
                        if matches!(command.as_str(), "pull" | "push" | "fetch")
                );
                if remote_timeout {
                    GitError::Network(e.to_string())
                } else {
                    GitError::Subprocess(e.to_string())
                }
            })
    }

    /// Run git and classify a non-zero exit from its stderr
    pub(super) async fn git_checked(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let output = self.git(args).await?;
        if output.success() {
            Ok(output)
        } else {
            let text = output.combined();
            if text.to_lowercase().contains("not a git repository") {
                return Err(GitError::NotARepository(self.root.clone()));
            }
            let command = args.first().copied().unwrap_or_default();
            Err(classify_failure(command, &text, output.exit_code))
        }
    }

    /// Check if the repository has at least one commit
    pub async fn has_commits(&self) -> Result<bool, GitError> {
        let output = self.git(&["rev-parse", "--verify", "--quiet", "HEAD"]).await?;
        Ok(output.success())
    }

    /// Get the current branch name; None when HEAD is detached
    pub async fn current_branch(&self) -> Result<Option<String>, GitError> {
        let output = self.git(&["symbolic-ref", "--quiet", "--short", "HEAD"]).await?;
        let branch = output.stdout.trim();
        if output.success() && !branch.is_empty() {
            Ok(Some(branch.to_string()))
        } else {
            Ok(None)
        }
    }

    /// URL of the named remote, if configured
    pub async fn remote_url(&self, remote: &str) -> Result<Option<String>, GitError> {
        let output = self.git(&["remote", "get-url", remote]).await?;
        let url = output.stdout.trim();
        if output.success() && !url.is_empty() {
            Ok(Some(url.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Commits ahead of and behind the upstream; None without an upstream
    pub async fn ahead_behind(&self) -> Result<Option<(usize, usize)>, GitError> {
        let output = self
            .git(&["rev-list", "--left-right", "--count", "HEAD...@{u}"])
            .await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_ahead_behind(&output.stdout))
    }

    /// Working tree state, change counts and upstream divergence
    pub async fn status(&self, remote: &str) -> Result<RepoStatus, GitError> {
        let porcelain = self
            .git_checked(&["status", "--porcelain", "-z", "--untracked-files=all"])
            .await?;
        let counts = parse_porcelain(&porcelain.stdout);

        let branch = self.current_branch().await?;
        let remote_url = self.remote_url(remote).await?;
        let upstream = self.ahead_behind().await?;
        let (ahead, behind) = upstream.unwrap_or((0, 0));

        let dirty = counts.changed + counts.added + counts.deleted > 0;
        let state = if dirty {
            RepoState::Dirty
        } else if ahead > 0 && behind > 0 {
            RepoState::Diverged
        } else if ahead > 0 {
            RepoState::Ahead
        } else if behind > 0 {
            RepoState::Behind
        } else {
            RepoState::Clean
        };

        Ok(RepoStatus {
            state,
            branch,
            remote_url,
            changed: counts.changed,
            added: counts.added,
            deleted: counts.deleted,
            ahead,
            behind,
            has_upstream: upstream.is_some(),
        })
    }

    /// Check if the repo has uncommitted changes, untracked files included
    pub async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        let output = self.git_checked(&["status", "--porcelain"]).await?;
        Ok(!output.stdout.trim().is_empty())
    }

    /// Get the root path
    pub fn root(&self) -> &Path {
        &self.root
    }
}
