use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::manifest::Manifest;
use crate::error::ErrorKind;

/// An independently version-controlled unit of the workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Unique module name
    pub name: String,

    /// Category tag, e.g. "manager"
    pub module_type: String,

    /// Module directory
    pub root_path: PathBuf,

    /// Repository checkout; usually equal to `root_path`
    pub git_root: PathBuf,

    pub manifest: Manifest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Problems found while loading the module (malformed manifest, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ModuleIssue>,
}

/// A non-fatal problem attached to a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleIssue {
    pub kind: ErrorKind,
    pub message: String,
}

impl ModuleIssue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Imports found in a module's sources, split by origin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSet {
    /// Workspace module names
    pub internal: BTreeSet<String>,
    /// Third-party package names
    pub external: BTreeSet<String>,
}
