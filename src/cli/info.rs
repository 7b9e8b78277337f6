//! Info command implementation

use anyhow::Result;
use serde_json::json;
use std::path::Path;

use super::{load_service, print_result};
use modscope::git::CancellationWatcher;

/// Show one module in detail
pub async fn info_command(work_dir: &Path, config_path: Option<&Path>, name: &str) -> Result<bool> {
    let service = load_service(work_dir, config_path)?;
    let result = service
        .call("get_module_info", json!({ "name": name }), &CancellationWatcher::never())
        .await;
    print_result(&result)
}
