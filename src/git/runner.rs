//! Git subprocess execution

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; -1 when killed by a signal
    pub exit_code: i32,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined, trimmed. git reports progress on stderr.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

#[derive(Debug, Error)]
pub enum GitRunError {
    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

/// Runs git commands in a repository. Implementations must be usable from
/// many tasks at once.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run_git(&self, root: &Path, args: &[&str]) -> Result<GitOutput, GitRunError>;
}

/// Runs the `git` binary found on PATH
#[derive(Debug, Clone)]
pub struct SystemGit {
    timeout: Duration,
}

impl SystemGit {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run_git(&self, root: &Path, args: &[&str]) -> Result<GitOutput, GitRunError> {
        debug!("git {} (in {})", args.join(" "), root.display());

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(root)
            .env("GIT_TERMINAL_PROMPT", "0")
            // Read-only commands must not refresh the index behind the user's back
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Discovery stops at `root`; a broken `.git` never falls through to
        // an enclosing repository
        let resolved = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        if let Some(parent) = resolved.parent() {
            cmd.env("GIT_CEILING_DIRECTORIES", parent);
        }

        // Never block on an ssh passphrase or host key prompt
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(GitRunError::Spawn)?,
            Err(_) => {
                return Err(GitRunError::Timeout {
                    command: args.first().copied().unwrap_or_default().to_string(),
                    timeout: self.timeout,
                });
            }
        };

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
