//! CLI command implementations

pub mod create;
pub mod git;
pub mod info;
pub mod init;
pub mod list;
pub mod serve;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use modscope::config::Config;
use modscope::git::{CancellationToken, CancellationWatcher};
use modscope::tools::ToolService;

/// Build the tool service for a workspace root
pub fn load_service(work_dir: &Path, config_path: Option<&Path>) -> Result<ToolService> {
    let root = work_dir
        .canonicalize()
        .with_context(|| format!("Workspace not found: {}", work_dir.display()))?;
    let config = Config::resolve(&root, config_path)?;
    Ok(ToolService::new(root, config))
}

/// Watcher that fires on Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationWatcher {
    let (token, watcher) = CancellationToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
    watcher
}

/// Print a tool result as pretty JSON; returns its `success` flag
pub fn print_result(value: &Value) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(value.get("success").and_then(Value::as_bool).unwrap_or(false))
}
