//! Init command implementation

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Default configuration written by `modscope init`
pub const DEFAULT_CONFIG: &str = r#"# modscope configuration
# ======================
#
# Every key is optional; omitted keys keep the built-in defaults shown here.

# ============================================================================
# WORKSPACE - where modules live
# ============================================================================
#
# A module is <root>/<category>/<name>/ containing the manifest file.
[workspace]
manifest_file = "init.yaml"
requirements_file = "requirements.txt"

# Category directory -> module type
[workspace.module_dirs]
cores = "core"
managers = "manager"
utils = "util"
plugins = "plugin"
mcps = "mcp"

# ============================================================================
# SCAN - import extraction and classification
# ============================================================================
#
#   internal_prefixes - namespace packages whose next segment names a module
#                       (`from managers.config_manager import X`)
#   exclude           - directory or file names skipped while scanning
#   stdlib_extra      - additional names treated as standard library
[scan]
source_extensions = ["py"]
internal_prefixes = ["cores", "managers", "utils", "plugins", "mcps", "project"]
exclude = [".git", "__pycache__", ".venv", "venv", "node_modules", "build", "dist", "*.egg-info"]
stdlib_extra = []

# Import name -> distribution name declared in the manifest
[scan.package_aliases]
yaml = "pyyaml"
PIL = "pillow"
cv2 = "opencv-python"
sklearn = "scikit-learn"
bs4 = "beautifulsoup4"

# ============================================================================
# GIT - batched operations
# ============================================================================
[git]
max_concurrent = 4
timeout_secs = 60
remote = "origin"
# Cancel modules still running after this many seconds
# batch_timeout_secs = 300

# ============================================================================
# SCAFFOLD - create_module defaults
# ============================================================================
[scaffold]
github_api_url = "https://api.github.com"
visibility = "private"
initial_version = "0.1.0"
git_init = true
"#;

/// Write the default config, refusing to overwrite unless `force` is set
pub async fn init_command(work_dir: &Path, config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path =
        config_path.unwrap_or_else(|| work_dir.join(".modscope").join("config.toml"));

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}
