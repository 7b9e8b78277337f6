//! Pull, commit and push operations for GitManager

use tracing::debug;

use super::GitManager;
use super::types::{GitError, PullReport, PushReport};

impl GitManager {
    /// Fast-forward the current branch from its upstream.
    ///
    /// `--ff-only` means a divergent history fails before any merge starts,
    /// so the working tree is never left with a merge in progress.
    pub async fn pull_ff_only(&self) -> Result<(PullReport, String), GitError> {
        let branch = self.current_branch().await?;
        let output = self.git_checked(&["pull", "--ff-only"]).await?;
        let text = output.combined();
        let up_to_date = text.to_lowercase().contains("already up to date");

        Ok((PullReport { branch, up_to_date }, text))
    }

    /// Stage everything and commit it.
    ///
    /// Returns the short hash of the new commit, or None when git found
    /// nothing to commit.
    pub async fn commit_all(&self, message: &str) -> Result<Option<String>, GitError> {
        self.git_checked(&["add", "--all"]).await?;

        let commit = self.git(&["commit", "-m", message]).await?;
        if !commit.success() {
            let text = commit.combined();
            if text.contains("nothing to commit") {
                debug!("git commit reported nothing to commit in {}", self.root().display());
                return Ok(None);
            }
            return Err(GitError::Subprocess(format!("git commit failed: {}", text)));
        }

        let hash = self.git_checked(&["rev-parse", "--short", "HEAD"]).await?;
        Ok(Some(hash.stdout.trim().to_string()))
    }

    /// Push `branch` to `remote`, setting it as upstream
    pub async fn push(&self, remote: &str, branch: &str) -> Result<String, GitError> {
        let output = self.git_checked(&["push", "-u", remote, branch]).await?;
        Ok(output.combined())
    }

    /// Commit pending changes (when there are any) and push the branch.
    ///
    /// A dirty tree requires `message`. A clean tree only pushes when it
    /// has commits the upstream lacks (or no upstream at all); otherwise
    /// `Ok(None)` is returned and nothing runs.
    pub async fn commit_and_push(
        &self,
        remote: &str,
        message: Option<&str>,
    ) -> Result<Option<(PushReport, String)>, GitError> {
        let dirty = self.has_uncommitted_changes().await?;
        let message = message.map(str::trim).filter(|m| !m.is_empty());

        if dirty && message.is_none() {
            return Err(GitError::MissingCommitMessage);
        }

        let branch = self.current_branch().await?.ok_or_else(|| {
            GitError::Subprocess("HEAD is detached; check out a branch before pushing".to_string())
        })?;

        let mut output = String::new();
        let commit = match message.filter(|_| dirty) {
            Some(message) => self.commit_all(message).await?,
            None => None,
        };

        match &commit {
            Some(hash) => output.push_str(&format!("Committed {}\n", hash)),
            None => {
                if !self.has_commits().await? {
                    return Ok(None);
                }
                if matches!(self.ahead_behind().await?, Some((0, _))) {
                    return Ok(None);
                }
            }
        }

        output.push_str(&self.push(remote, &branch).await?);

        Ok(Some((
            PushReport {
                branch,
                remote: remote.to_string(),
                commit,
            },
            output.trim().to_string(),
        )))
    }
}
