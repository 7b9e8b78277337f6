//! Diff operations for GitManager

use std::collections::HashMap;
use tracing::warn;

use super::GitManager;
use super::types::{ChangeType, DiffReport, FileChange, GitError, parse_numstat_output, parse_porcelain};

impl GitManager {
    /// Report every uncommitted change of the working tree.
    ///
    /// Unstaged and staged numstat are merged by path; untracked files
    /// follow with their line count as insertions.
    pub async fn diff_report(&self) -> Result<DiffReport, GitError> {
        let mut files: Vec<FileChange> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for args in [
            &["diff", "--numstat", "--no-renames"][..],
            &["diff", "--cached", "--numstat", "--no-renames"][..],
        ] {
            let output = self.git_checked(args).await?;
            for (path, added, removed, is_binary) in parse_numstat_output(&output.stdout) {
                match index.get(&path) {
                    Some(&i) => {
                        let entry = &mut files[i];
                        entry.insertions += added;
                        entry.deletions += removed;
                        entry.is_binary |= is_binary;
                    }
                    None => {
                        index.insert(path.clone(), files.len());
                        files.push(FileChange {
                            file: path,
                            change_type: ChangeType::Modified,
                            insertions: added,
                            deletions: removed,
                            is_binary,
                        });
                    }
                }
            }
        }

        let status = self
            .git_checked(&["status", "--porcelain", "-z", "--untracked-files=all"])
            .await?;
        for path in parse_porcelain(&status.stdout).untracked {
            if index.contains_key(&path) {
                continue;
            }
            let insertions = match tokio::fs::read(self.root().join(&path)).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).lines().count(),
                Err(e) => {
                    warn!("Cannot count lines of {}: {}", path, e);
                    0
                }
            };
            files.push(FileChange {
                file: path,
                change_type: ChangeType::Added,
                insertions,
                deletions: 0,
                is_binary: false,
            });
        }

        Ok(DiffReport::from_files(files))
    }
}
