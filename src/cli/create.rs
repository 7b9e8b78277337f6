//! Create command implementation

use anyhow::Result;
use serde_json::json;
use std::path::Path;

use super::{load_service, print_result};
use modscope::git::CancellationWatcher;

pub async fn create_command(
    work_dir: &Path,
    config_path: Option<&Path>,
    name: &str,
    module_type: &str,
    create_repo: bool,
    owner: Option<String>,
) -> Result<bool> {
    let service = load_service(work_dir, config_path)?;
    let args = json!({
        "name": name,
        "module_type": module_type,
        "create_repo": create_repo,
        "owner": owner,
    });
    let result = service
        .call("create_module", args, &CancellationWatcher::never())
        .await;
    print_result(&result)
}
