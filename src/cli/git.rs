//! Git command implementation

use anyhow::Result;
use serde_json::json;
use std::path::Path;

use super::{cancel_on_ctrl_c, load_service, print_result};

/// Run one git action over the workspace; Ctrl-C cancels unfinished modules
pub async fn git_command(
    work_dir: &Path,
    config_path: Option<&Path>,
    action: &str,
    module: Option<String>,
    message: Option<String>,
    types: Vec<String>,
) -> Result<bool> {
    let service = load_service(work_dir, config_path)?;
    let args = json!({
        "action": action,
        "module_name": module,
        "commit_message": message,
        "types": types,
    });
    let result = service.call("git_modules", args, &cancel_on_ctrl_c()).await;
    print_result(&result)
}
