//! Git operations across module repositories

mod aggregator;
mod cancel;
mod manager;
mod runner;

pub use aggregator::{GitAction, GitAggregator, GitDetail, GitOutcome, GitParams};
pub use cancel::{CancellationToken, CancellationWatcher};
pub use manager::{
    ChangeType, DiffReport, FileChange, GitError, GitManager, PullReport, PushReport, RepoState,
    RepoStatus, classify_failure,
};
pub use runner::{GitOutput, GitRunError, GitRunner, SystemGit};
