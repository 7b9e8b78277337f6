//! Configuration loading and management

mod io;
mod settings;

pub use settings::{GitSettings, ScaffoldSettings, ScanSettings, WorkspaceSettings};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Module layout of the workspace
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    /// Import scanning rules
    #[serde(default)]
    pub scan: ScanSettings,

    /// Git aggregation settings
    #[serde(default)]
    pub git: GitSettings,

    /// Scaffolding defaults
    #[serde(default)]
    pub scaffold: ScaffoldSettings,
}
