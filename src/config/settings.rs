//! Settings sections of the workspace configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workspace layout: where modules live and what their manifests are called
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Category directory (relative to the workspace root) -> module type
    #[serde(default = "default_module_dirs")]
    pub module_dirs: BTreeMap<String, String>,

    /// Manifest file name inside each module directory
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Optional pip-style requirements file merged into the external dependencies
    #[serde(default = "default_requirements_file")]
    pub requirements_file: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            module_dirs: default_module_dirs(),
            manifest_file: default_manifest_file(),
            requirements_file: default_requirements_file(),
        }
    }
}

impl WorkspaceSettings {
    /// Category directory that holds modules of the given type
    pub fn dir_for_type(&self, module_type: &str) -> Option<&str> {
        self.module_dirs
            .iter()
            .find(|(_, ty)| ty.as_str() == module_type)
            .map(|(dir, _)| dir.as_str())
    }

    /// All configured module types, sorted and deduplicated
    pub fn module_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.module_dirs.values().cloned().collect();
        types.sort();
        types.dedup();
        types
    }
}

fn default_module_dirs() -> BTreeMap<String, String> {
    [
        ("cores", "core"),
        ("managers", "manager"),
        ("utils", "util"),
        ("plugins", "plugin"),
        ("mcps", "mcp"),
    ]
    .into_iter()
    .map(|(dir, ty)| (dir.to_string(), ty.to_string()))
    .collect()
}

fn default_manifest_file() -> String {
    "init.yaml".to_string()
}

fn default_requirements_file() -> String {
    "requirements.txt".to_string()
}

/// Import scanning and classification rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// File extensions parsed for imports
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Glob patterns for directories and files that are never scanned.
    /// Matched against each path component name.
    #[serde(default = "default_scan_exclude")]
    pub exclude: Vec<String>,

    /// Namespace packages whose next segment names a workspace module,
    /// e.g. `managers.config_manager` -> `config_manager`
    #[serde(default = "default_internal_prefixes")]
    pub internal_prefixes: Vec<String>,

    /// Import name -> distribution name, for packages whose import differs
    /// from what the manifest declares (`yaml` is provided by `PyYAML`)
    #[serde(default = "default_package_aliases")]
    pub package_aliases: BTreeMap<String, String>,

    /// Extra names treated as standard library on top of the built-in table
    #[serde(default)]
    pub stdlib_extra: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            source_extensions: default_source_extensions(),
            exclude: default_scan_exclude(),
            internal_prefixes: default_internal_prefixes(),
            package_aliases: default_package_aliases(),
            stdlib_extra: Vec::new(),
        }
    }
}

fn default_source_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_scan_exclude() -> Vec<String> {
    [
        ".git",
        ".hg",
        ".svn",
        "__pycache__",
        ".venv",
        "venv",
        ".env",
        ".tox",
        ".nox",
        ".mypy_cache",
        ".pytest_cache",
        ".ruff_cache",
        "node_modules",
        "site-packages",
        "build",
        "dist",
        "target",
        "*.egg-info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_internal_prefixes() -> Vec<String> {
    ["cores", "managers", "utils", "plugins", "mcps", "project"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_package_aliases() -> BTreeMap<String, String> {
    [
        ("yaml", "pyyaml"),
        ("PIL", "pillow"),
        ("cv2", "opencv-python"),
        ("sklearn", "scikit-learn"),
        ("bs4", "beautifulsoup4"),
        ("dateutil", "python-dateutil"),
        ("dotenv", "python-dotenv"),
        ("git", "gitpython"),
        ("jwt", "pyjwt"),
        ("magic", "python-magic"),
        ("serial", "pyserial"),
        ("usb", "pyusb"),
        ("zmq", "pyzmq"),
        ("Crypto", "pycryptodome"),
        ("OpenSSL", "pyopenssl"),
        ("google.protobuf", "protobuf"),
        ("attr", "attrs"),
        ("docx", "python-docx"),
        ("fitz", "pymupdf"),
    ]
    .into_iter()
    .map(|(import, dist)| (import.to_string(), dist.to_string()))
    .collect()
}

/// Git aggregation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Maximum number of modules processed at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Timeout for a single git command, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional deadline for a whole batch; unfinished modules are cancelled
    #[serde(default)]
    pub batch_timeout_secs: Option<u64>,

    /// Remote used for push
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            batch_timeout_secs: None,
            remote: default_remote(),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Module scaffolding defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldSettings {
    /// Base URL of the repository host REST API
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Visibility of created repositories ("public" or "private")
    #[serde(default = "default_visibility")]
    pub visibility: String,

    /// Version written into new manifests
    #[serde(default = "default_initial_version")]
    pub initial_version: String,

    /// Run `git init` in new module directories
    #[serde(default = "default_git_init")]
    pub git_init: bool,
}

impl Default for ScaffoldSettings {
    fn default() -> Self {
        Self {
            github_api_url: default_github_api_url(),
            visibility: default_visibility(),
            initial_version: default_initial_version(),
            git_init: default_git_init(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_initial_version() -> String {
    "0.1.0".to_string()
}

fn default_git_init() -> bool {
    true
}
