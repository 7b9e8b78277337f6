//! List command implementation

use anyhow::Result;
use serde_json::json;
use std::path::Path;

use super::{load_service, print_result};
use modscope::git::CancellationWatcher;

pub async fn list_command(
    work_dir: &Path,
    config_path: Option<&Path>,
    with_imports: bool,
    types: Vec<String>,
) -> Result<bool> {
    let service = load_service(work_dir, config_path)?;
    let args = json!({ "with_imports": with_imports, "types": types });
    let result = service
        .call("list_modules", args, &CancellationWatcher::never())
        .await;
    print_result(&result)
}
