//! Batch git actions across many modules
//!
//! Each module is processed in its own task. One module's failure never
//! affects another, outcomes come back in input order, and mutating actions
//! on a shared git root are serialized.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cancel::CancellationWatcher;
use super::manager::{DiffReport, GitError, GitManager, PullReport, PushReport, RepoStatus};
use super::runner::GitRunner;
use crate::config::GitSettings;
use crate::domain::Module;
use crate::error::ErrorKind;

/// Git action applied to every selected module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitAction {
    Status,
    Diff,
    Pull,
    Push,
}

impl GitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitAction::Status => "status",
            GitAction::Diff => "diff",
            GitAction::Pull => "pull",
            GitAction::Push => "push",
        }
    }

    /// Whether the action can change a repository
    pub fn is_mutating(&self) -> bool {
        matches!(self, GitAction::Pull | GitAction::Push)
    }
}

impl fmt::Display for GitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GitAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" => Ok(GitAction::Status),
            "diff" => Ok(GitAction::Diff),
            "pull" => Ok(GitAction::Pull),
            "push" => Ok(GitAction::Push),
            other => Err(format!(
                "unknown git action '{}' (expected status, diff, pull or push)",
                other
            )),
        }
    }
}

/// Parameters shared by every module of a batch
#[derive(Debug, Clone, Default)]
pub struct GitParams {
    /// Required by push for modules with uncommitted changes
    pub commit_message: Option<String>,
}

/// Structured result attached to an outcome
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GitDetail {
    Status(RepoStatus),
    Diff(DiffReport),
    Pull(PullReport),
    Push(PushReport),
}

/// Result of one action on one module
#[derive(Debug, Clone, Serialize)]
pub struct GitOutcome {
    pub module_name: String,
    pub action: GitAction,
    pub success: bool,
    /// Human-readable text: git's own output for pull/push, a summary otherwise
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Why the action was intentionally not performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<GitDetail>,
}

impl GitOutcome {
    fn completed(module_name: &str, action: GitAction, done: ActionOutput) -> Self {
        Self {
            module_name: module_name.to_string(),
            action,
            success: true,
            output: done.output,
            error: None,
            message: None,
            skipped: done.skipped,
            detail: done.detail,
        }
    }

    fn failed(module_name: &str, action: GitAction, error: &GitError) -> Self {
        Self {
            module_name: module_name.to_string(),
            action,
            success: false,
            output: String::new(),
            error: Some(error.kind()),
            message: Some(error.to_string()),
            skipped: None,
            detail: None,
        }
    }
}

struct ActionOutput {
    output: String,
    detail: Option<GitDetail>,
    skipped: Option<String>,
}

impl ActionOutput {
    fn done(output: String, detail: GitDetail) -> Self {
        Self {
            output,
            detail: Some(detail),
            skipped: None,
        }
    }

    fn skipped(reason: &str, detail: Option<GitDetail>) -> Self {
        Self {
            output: String::new(),
            detail,
            skipped: Some(reason.to_string()),
        }
    }
}

/// Runs one git action across many modules with bounded concurrency
#[derive(Clone)]
pub struct GitAggregator {
    runner: Arc<dyn GitRunner>,
    max_concurrent: usize,
    remote: String,
    batch_timeout: Option<Duration>,
}

impl GitAggregator {
    pub fn new(runner: Arc<dyn GitRunner>, settings: &GitSettings) -> Self {
        Self {
            runner,
            max_concurrent: settings.max_concurrent.max(1),
            remote: settings.remote.clone(),
            batch_timeout: settings.batch_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Run `action` on `modules`, one outcome per selected module in input order.
    ///
    /// Modules not yet finished when `cancel` fires, or when the batch
    /// timeout elapses, get a `Cancelled` outcome. In-flight git processes
    /// are killed.
    pub async fn run(
        &self,
        action: GitAction,
        modules: &[Module],
        params: &GitParams,
        cancel: &CancellationWatcher,
    ) -> Vec<GitOutcome> {
        info!("git {} on {} module(s)", action, modules.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let deadline = self.batch_timeout.map(|t| Instant::now() + t);
        let params = Arc::new(params.clone());
        let remote: Arc<str> = Arc::from(self.remote.as_str());
        let mut root_locks: HashMap<PathBuf, Arc<Mutex<()>>> = HashMap::new();

        let mut tasks = Vec::with_capacity(modules.len());
        for (index, module) in modules.iter().enumerate() {
            let lock = action.is_mutating().then(|| {
                let key = std::fs::canonicalize(&module.git_root)
                    .unwrap_or_else(|_| module.git_root.clone());
                root_locks.entry(key).or_default().clone()
            });

            let job = ModuleJob {
                module: module.clone(),
                action,
                params: params.clone(),
                remote: remote.clone(),
                runner: self.runner.clone(),
                semaphore: semaphore.clone(),
                lock,
                cancel: cancel.clone(),
                deadline,
            };

            let name = module.name.clone();
            tasks.push((index, name, tokio::spawn(job.run())));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, name, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("git {} task for {} failed: {}", action, name, e);
                    GitOutcome::failed(
                        &name,
                        action,
                        &GitError::Subprocess(format!("task failed: {}", e)),
                    )
                }
            };
            outcomes.push((index, outcome));
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Everything one module task owns
struct ModuleJob {
    module: Module,
    action: GitAction,
    params: Arc<GitParams>,
    remote: Arc<str>,
    runner: Arc<dyn GitRunner>,
    semaphore: Arc<Semaphore>,
    lock: Option<Arc<Mutex<()>>>,
    cancel: CancellationWatcher,
    deadline: Option<Instant>,
}

impl ModuleJob {
    async fn run(mut self) -> GitOutcome {
        let name = self.module.name.clone();
        let action = self.action;

        if self.cancel.is_cancelled() {
            return GitOutcome::failed(
                &name,
                action,
                &GitError::Cancelled("Cancelled before start".to_string()),
            );
        }

        let mut cancel = self.cancel.clone();
        let deadline = self.deadline;

        tokio::select! {
            result = self.execute() => match result {
                Ok(done) => GitOutcome::completed(&name, action, done),
                Err(e) => {
                    debug!("git {} failed for {}: {}", action, name, e);
                    GitOutcome::failed(&name, action, &e)
                }
            },
            _ = cancel.cancelled() => GitOutcome::failed(
                &name,
                action,
                &GitError::Cancelled("Cancelled".to_string()),
            ),
            _ = wait_for_deadline(deadline) => GitOutcome::failed(
                &name,
                action,
                &GitError::Cancelled("Batch timeout elapsed".to_string()),
            ),
        }
    }

    async fn execute(&mut self) -> Result<ActionOutput, GitError> {
        let _root_guard = match &self.lock {
            Some(lock) => Some(lock.clone().lock_owned().await),
            None => None,
        };
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GitError::Cancelled("Batch closed".to_string()))?;

        let manager = GitManager::open(&self.module.git_root, self.runner.clone()).await?;
        let remote = &*self.remote;

        match self.action {
            GitAction::Status => {
                let status = manager.status(remote).await?;
                Ok(ActionOutput::done(status.summary(), GitDetail::Status(status)))
            }
            GitAction::Diff => {
                let report = manager.diff_report().await?;
                Ok(ActionOutput::done(render_diff(&report), GitDetail::Diff(report)))
            }
            GitAction::Pull => {
                let status = manager.status(remote).await?;
                if status.is_dirty() {
                    return Ok(ActionOutput::skipped(
                        "uncommitted changes; commit or stash them before pulling",
                        Some(GitDetail::Status(status)),
                    ));
                }
                if !status.has_upstream {
                    return Ok(ActionOutput::skipped(
                        "no upstream branch configured",
                        Some(GitDetail::Status(status)),
                    ));
                }
                let (report, text) = manager.pull_ff_only().await?;
                Ok(ActionOutput::done(text, GitDetail::Pull(report)))
            }
            GitAction::Push => {
                let message = self.params.commit_message.as_deref();
                if manager.remote_url(remote).await?.is_none() {
                    let has_message = message.is_some_and(|m| !m.trim().is_empty());
                    if !has_message && manager.has_uncommitted_changes().await? {
                        return Err(GitError::MissingCommitMessage);
                    }
                    return Ok(ActionOutput::skipped(
                        &format!("no remote '{}' configured", remote),
                        None,
                    ));
                }
                match manager.commit_and_push(remote, message).await? {
                    Some((report, text)) => Ok(ActionOutput::done(text, GitDetail::Push(report))),
                    None => Ok(ActionOutput::skipped("nothing to push", None)),
                }
            }
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn render_diff(report: &DiffReport) -> String {
    let mut lines: Vec<String> = report
        .files
        .iter()
        .map(|f| {
            if f.is_binary {
                format!("{} (binary)", f.file)
            } else {
                format!("{} +{} -{}", f.file, f.insertions, f.deletions)
            }
        })
        .collect();
    lines.push(report.summary.clone());
    lines.join("\n")
}
