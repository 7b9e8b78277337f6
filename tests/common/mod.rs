//! Shared test utilities for workspace integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use modscope::config::Config;
use modscope::tools::ToolService;

/// Run git in `dir`, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> Output {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

/// Turn `dir` into a git repository and commit everything in it
pub fn init_repo(dir: &Path) {
    git(dir, &["init"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["add", "--all"]);
    git(dir, &["commit", "--allow-empty", "-m", "Initial commit"]);
    git(dir, &["branch", "-M", "main"]);
}

/// Throwaway workspace laid out as `<root>/<category>/<module>/`
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create a module directory with the given `init.yaml` body
    pub fn add_module(&self, category: &str, name: &str, manifest: &str) -> PathBuf {
        let dir = self.root().join(category).join(name);
        fs::create_dir_all(&dir).expect("Failed to create module dir");
        fs::write(dir.join("init.yaml"), manifest).expect("Failed to write manifest");
        dir
    }

    /// Write a file relative to the workspace root, creating parents
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn service(&self) -> ToolService {
        ToolService::new(self.root(), Config::default())
    }
}
