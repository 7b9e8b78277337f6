use super::*;
use crate::domain::Manifest;
use crate::git::{CancellationToken, GitOutput, GitRunError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex as StdMutex;
use tempfile::TempDir;

/// Scripted behaviour of one fake repository
#[derive(Clone, Default)]
struct FakeRepo {
    delay_ms: u64,
    dirty: bool,
    ahead: usize,
    push_stderr: Option<String>,
    no_remote: bool,
}

/// Answers git commands from a script instead of running git
#[derive(Default)]
struct FakeGit {
    repos: HashMap<PathBuf, FakeRepo>,
    in_flight: StdMutex<HashMap<PathBuf, usize>>,
    max_same_root: StdMutex<usize>,
    calls: StdMutex<Vec<(PathBuf, String)>>,
}

impl FakeGit {
    fn with(mut self, root: &Path, repo: FakeRepo) -> Self {
        self.repos.insert(root.to_path_buf(), repo);
        self
    }

    fn commands_for(&self, root: &Path) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == root)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn ok(stdout: &str) -> GitOutput {
        GitOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        }
    }
}

#[async_trait]
impl GitRunner for FakeGit {
    async fn run_git(&self, root: &Path, args: &[&str]) -> Result<GitOutput, GitRunError> {
        let repo = self.repos.get(root).cloned().unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push((root.to_path_buf(), args.join(" ")));

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(root.to_path_buf()).or_insert(0);
            *count += 1;
            let mut max = self.max_same_root.lock().unwrap();
            *max = (*max).max(*count);
        }

        tokio::time::sleep(Duration::from_millis(repo.delay_ms)).await;

        if let Some(count) = self.in_flight.lock().unwrap().get_mut(root) {
            *count -= 1;
        }

        let output = match args {
            ["status", ..] if repo.dirty => Self::ok(" M module.py\0"),
            ["status", ..] => Self::ok(""),
            ["symbolic-ref", ..] => Self::ok("main\n"),
            ["remote", "get-url", _] if repo.no_remote => GitOutput {
                stdout: String::new(),
                stderr: "error: No such remote 'origin'\n".to_string(),
                exit_code: 2,
            },
            ["remote", "get-url", _] => Self::ok("git@example.com:org/repo.git\n"),
            ["rev-parse", "--show-toplevel"] => Self::ok(&format!("{}\n", root.display())),
            ["rev-list", ..] => Self::ok(&format!("{}\t0\n", repo.ahead)),
            ["rev-parse", "--short", ..] => Self::ok("abc1234\n"),
            ["push", ..] => match &repo.push_stderr {
                Some(stderr) => GitOutput {
                    stdout: String::new(),
                    stderr: stderr.clone(),
                    exit_code: 128,
                },
                None => Self::ok("pushed\n"),
            },
            ["pull", ..] => Self::ok("Already up to date.\n"),
            _ => Self::ok(""),
        };
        Ok(output)
    }
}

fn module(tmp: &TempDir, name: &str, with_git: bool) -> Module {
    let root = tmp.path().join(name);
    std::fs::create_dir_all(&root).unwrap();
    if with_git {
        std::fs::create_dir_all(root.join(".git")).unwrap();
    }
    Module {
        name: name.to_string(),
        module_type: "manager".to_string(),
        root_path: root.clone(),
        git_root: root,
        manifest: Manifest::default(),
        version: None,
        repo_url: None,
        issues: Vec::new(),
    }
}

fn aggregator(runner: Arc<FakeGit>, max_concurrent: usize) -> GitAggregator {
    let settings = GitSettings {
        max_concurrent,
        ..GitSettings::default()
    };
    GitAggregator::new(runner, &settings)
}

#[tokio::test]
async fn outcomes_keep_input_order_under_varied_latency() {
    let tmp = TempDir::new().unwrap();
    let modules: Vec<Module> = ["slow", "medium", "fast"]
        .iter()
        .map(|n| module(&tmp, n, true))
        .collect();
    let runner = Arc::new(
        FakeGit::default()
            .with(&modules[0].git_root, FakeRepo { delay_ms: 60, ..Default::default() })
            .with(&modules[1].git_root, FakeRepo { delay_ms: 30, ..Default::default() })
            .with(&modules[2].git_root, FakeRepo { delay_ms: 1, ..Default::default() }),
    );

    let outcomes = aggregator(runner, 4)
        .run(GitAction::Status, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    let names: Vec<_> = outcomes.iter().map(|o| o.module_name.as_str()).collect();
    assert_eq!(names, vec!["slow", "medium", "fast"]);
    assert!(outcomes.iter().all(|o| o.success));
    assert!(matches!(outcomes[0].detail, Some(GitDetail::Status(_))));
}

#[tokio::test]
async fn one_broken_module_does_not_affect_others() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![
        module(&tmp, "alpha", true),
        module(&tmp, "broken", false),
        module(&tmp, "gamma", true),
    ];
    let runner = Arc::new(FakeGit::default());

    let outcomes = aggregator(runner, 2)
        .run(GitAction::Status, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[1].error, Some(ErrorKind::NotARepository));
    assert!(outcomes[1].message.is_some());
    assert!(outcomes[2].success);
}

#[tokio::test]
async fn push_guard_only_blocks_dirty_modules() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![
        module(&tmp, "dirty", true),
        module(&tmp, "ahead", true),
        module(&tmp, "synced", true),
    ];
    let runner = Arc::new(
        FakeGit::default()
            .with(&modules[0].git_root, FakeRepo { dirty: true, ..Default::default() })
            .with(&modules[1].git_root, FakeRepo { ahead: 2, ..Default::default() }),
    );

    let outcomes = aggregator(runner.clone(), 4)
        .run(GitAction::Push, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert_eq!(outcomes[0].error, Some(ErrorKind::MissingCommitMessage));
    assert!(outcomes[1].success);
    assert!(outcomes[1].skipped.is_none());
    assert!(outcomes[2].success);
    assert_eq!(outcomes[2].skipped.as_deref(), Some("nothing to push"));

    // The guarded module never staged or committed anything
    let dirty_cmds = runner.commands_for(&modules[0].git_root);
    assert!(dirty_cmds.iter().all(|c| !c.starts_with("add") && !c.starts_with("commit")));
    assert!(
        runner
            .commands_for(&modules[1].git_root)
            .contains(&"push -u origin main".to_string())
    );
}

#[tokio::test]
async fn push_with_message_commits_dirty_module() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "dirty", true)];
    let runner = Arc::new(
        FakeGit::default().with(&modules[0].git_root, FakeRepo { dirty: true, ..Default::default() }),
    );
    let params = GitParams {
        commit_message: Some("Update imports".to_string()),
    };

    let outcomes = aggregator(runner.clone(), 4)
        .run(GitAction::Push, &modules, &params, &CancellationWatcher::never())
        .await;

    assert!(outcomes[0].success, "{:?}", outcomes[0]);
    match &outcomes[0].detail {
        Some(GitDetail::Push(report)) => assert_eq!(report.commit.as_deref(), Some("abc1234")),
        other => panic!("expected push detail, got {:?}", other),
    }
    let cmds = runner.commands_for(&modules[0].git_root);
    assert!(cmds.contains(&"add --all".to_string()));
    assert!(cmds.contains(&"commit -m Update imports".to_string()));
}

#[tokio::test]
async fn push_failures_are_classified() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "offline", true), module(&tmp, "behind", true)];
    let runner = Arc::new(
        FakeGit::default()
            .with(
                &modules[0].git_root,
                FakeRepo {
                    ahead: 1,
                    push_stderr: Some("fatal: unable to access 'https://x/': Could not resolve host: x".into()),
                    ..Default::default()
                },
            )
            .with(
                &modules[1].git_root,
                FakeRepo {
                    ahead: 1,
                    push_stderr: Some(" ! [rejected] main -> main (fetch first)".into()),
                    ..Default::default()
                },
            ),
    );

    let outcomes = aggregator(runner, 4)
        .run(GitAction::Push, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert_eq!(outcomes[0].error, Some(ErrorKind::NetworkError));
    assert_eq!(outcomes[1].error, Some(ErrorKind::MergeConflict));
}

#[tokio::test]
async fn pull_skips_dirty_modules() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "dirty", true), module(&tmp, "clean", true)];
    let runner = Arc::new(
        FakeGit::default().with(&modules[0].git_root, FakeRepo { dirty: true, ..Default::default() }),
    );

    let outcomes = aggregator(runner.clone(), 4)
        .run(GitAction::Pull, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert!(outcomes[0].success);
    assert!(outcomes[0].skipped.is_some());
    assert!(
        runner
            .commands_for(&modules[0].git_root)
            .iter()
            .all(|c| !c.starts_with("pull"))
    );
    assert!(outcomes[1].success);
    assert!(matches!(outcomes[1].detail, Some(GitDetail::Pull(ref r)) if r.up_to_date));
}

#[tokio::test]
async fn push_skips_module_without_remote() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "local_only", true)];
    let runner = Arc::new(FakeGit::default().with(
        &modules[0].git_root,
        FakeRepo { ahead: 2, no_remote: true, ..Default::default() },
    ));

    let outcomes = aggregator(runner.clone(), 4)
        .run(GitAction::Push, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert!(outcomes[0].success, "{:?}", outcomes[0]);
    assert_eq!(outcomes[0].skipped.as_deref(), Some("no remote 'origin' configured"));

    assert!(
        runner
            .commands_for(&modules[0].git_root)
            .iter()
            .all(|c| !c.starts_with("push") && !c.starts_with("commit"))
    );

    let dirty = vec![module(&tmp, "local_dirty", true)];
    let runner = Arc::new(FakeGit::default().with(
        &dirty[0].git_root,
        FakeRepo { dirty: true, no_remote: true, ..Default::default() },
    ));
    let guarded = aggregator(runner, 4)
        .run(GitAction::Push, &dirty, &GitParams::default(), &CancellationWatcher::never())
        .await;
    assert_eq!(guarded[0].error, Some(ErrorKind::MissingCommitMessage));
}

#[tokio::test]
async fn module_resolving_to_another_repository_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "nested", true)];

    struct ParentGit;

    #[async_trait]
    impl GitRunner for ParentGit {
        async fn run_git(&self, root: &Path, _args: &[&str]) -> Result<GitOutput, GitRunError> {
            let parent = root.parent().unwrap_or(root);
            Ok(FakeGit::ok(&format!("{}\n", parent.display())))
        }
    }

    let settings = GitSettings::default();
    let outcomes = GitAggregator::new(Arc::new(ParentGit), &settings)
        .run(GitAction::Status, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert!(!outcomes[0].success);
    assert_eq!(outcomes[0].error, Some(ErrorKind::NotARepository));
}

#[tokio::test]
async fn cancellation_marks_unfinished_modules() {
    let tmp = TempDir::new().unwrap();
    let modules: Vec<Module> = ["a", "b", "c"].iter().map(|n| module(&tmp, n, true)).collect();
    let mut runner = FakeGit::default();
    for m in &modules {
        runner = runner.with(&m.git_root, FakeRepo { delay_ms: 500, ..Default::default() });
    }

    let (token, watcher) = CancellationToken::new();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let outcomes = aggregator(Arc::new(runner), 1)
        .run(GitAction::Status, &modules, &GitParams::default(), &watcher)
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.error == Some(ErrorKind::Cancelled)));
}

#[tokio::test]
async fn batch_timeout_cancels_slow_modules() {
    let tmp = TempDir::new().unwrap();
    let modules = vec![module(&tmp, "slow", true)];
    let runner = Arc::new(
        FakeGit::default().with(&modules[0].git_root, FakeRepo { delay_ms: 2_000, ..Default::default() }),
    );
    let mut agg = aggregator(runner, 4);
    agg.batch_timeout = Some(Duration::from_millis(50));

    let outcomes = agg
        .run(GitAction::Status, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert_eq!(outcomes[0].error, Some(ErrorKind::Cancelled));
    assert_eq!(outcomes[0].message.as_deref(), Some("Batch timeout elapsed"));
}

#[tokio::test]
async fn mutating_actions_on_shared_root_are_serialized() {
    let tmp = TempDir::new().unwrap();
    let shared = module(&tmp, "repo", true);
    let mut first = shared.clone();
    first.name = "first".to_string();
    let mut second = shared.clone();
    second.name = "second".to_string();
    let modules = vec![first, second];

    let runner = Arc::new(FakeGit::default().with(
        &shared.git_root,
        FakeRepo {
            delay_ms: 10,
            ahead: 1,
            ..Default::default()
        },
    ));

    let outcomes = aggregator(runner.clone(), 4)
        .run(GitAction::Push, &modules, &GitParams::default(), &CancellationWatcher::never())
        .await;

    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(*runner.max_same_root.lock().unwrap(), 1);
}

#[test]
fn action_parsing() {
    assert_eq!("Push".parse::<GitAction>().unwrap(), GitAction::Push);
    assert!("merge".parse::<GitAction>().is_err());
    assert!(GitAction::Pull.is_mutating());
    assert!(!GitAction::Diff.is_mutating());
    assert_eq!(serde_json::to_string(&GitAction::Status).unwrap(), "\"status\"");
}
