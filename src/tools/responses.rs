//! Tool arguments and JSON response shapes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::deps::DependencyFinding;
use crate::domain::{ImportSet, Manifest, Module, ModuleIssue};
use crate::error::{ErrorKind, ToolError};
use crate::git::{GitAction, GitOutcome, RepoStatus};
use crate::scaffold::RepoResult;
use crate::scanner::ScanIssue;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListModulesArgs {
    #[serde(default)]
    pub with_imports: bool,
    /// Only modules of these types; all when empty
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleInfoArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateModuleArgs {
    pub name: String,
    pub module_type: String,
    #[serde(default)]
    pub create_repo: bool,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitModulesArgs {
    pub action: GitAction,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

/// One module as shown by the tools
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub module_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Module directory relative to the workspace root
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub manifest_summary: Manifest,
    pub issues: Vec<ModuleIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imports: Option<ImportSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<DependencyFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_issues: Option<Vec<ScanIssue>>,
}

impl ModuleSummary {
    pub fn new(module: &Module, root: &Path) -> Self {
        Self {
            name: module.name.clone(),
            module_type: module.module_type.clone(),
            version: module.version.clone(),
            path: module
                .root_path
                .strip_prefix(root)
                .unwrap_or(&module.root_path)
                .to_path_buf(),
            repo_url: module.repo_url.clone(),
            manifest_summary: module.manifest.clone(),
            issues: module.issues.clone(),
            imports: None,
            findings: None,
            scan_issues: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListModulesResponse {
    pub success: bool,
    pub count: usize,
    pub modules: Vec<ModuleSummary>,
    /// Workspace-level problems such as duplicate module names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registry_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfoResponse {
    pub success: bool,
    pub module: ModuleSummary,
    pub imports: ImportSet,
    pub stdlib: BTreeSet<String>,
    pub local: BTreeSet<String>,
    pub scan_issues: Vec<ScanIssue>,
    pub git_status: Option<RepoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_error: Option<ErrorResponse>,
    pub findings: DependencyFinding,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateModuleResponse {
    pub success: bool,
    pub module: ModuleSummary,
    pub path: PathBuf,
    pub files_created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_result: Option<RepoResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitModulesResponse {
    /// True iff every outcome succeeded
    pub success: bool,
    pub action: GitAction,
    pub count: usize,
    pub outcomes: Vec<GitOutcome>,
}

/// Top-level failure of a tool call
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

impl From<&ToolError> for ErrorResponse {
    fn from(err: &ToolError) -> Self {
        let mut response = ErrorResponse::new(err.kind(), err.to_string());
        if let ToolError::NotFound { suggestions, .. } = err {
            response.suggestions = suggestions.clone();
        }
        response
    }
}
