//! Module registry for a multi-repository workspace
//!
//! The registry is rebuilt from disk for every tool invocation, so it always
//! reflects the live state of the workspace. Nothing is cached between calls.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::WorkspaceSettings;
use crate::domain::manifest::parse_requirements;
use crate::domain::{ManifestFile, Module, ModuleIssue, normalize_name};
use crate::error::{ErrorKind, ToolError};

/// Maximum number of suggestions attached to a `NotFound` error
const MAX_SUGGESTIONS: usize = 3;

/// Authoritative list of the modules of one workspace
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    /// Workspace root
    root: PathBuf,

    /// Modules ordered by name
    modules: Vec<Module>,

    /// Registry-level problems (duplicate names, unreadable directories)
    issues: Vec<String>,
}

impl ModuleRegistry {
    /// Build a registry directly from module records
    pub fn from_modules(root: impl Into<PathBuf>, mut modules: Vec<Module>) -> Self {
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            root: root.into(),
            modules,
            issues: Vec::new(),
        }
    }

    /// Discover every module under the workspace root.
    ///
    /// A module is a directory `<root>/<category>/<name>/` that contains the
    /// manifest file. Malformed manifests do not hide the module; they are
    /// recorded as issues on it.
    pub fn load(root: &Path, settings: &WorkspaceSettings) -> Result<Self> {
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };

        let mut candidates: Vec<(PathBuf, String)> = Vec::new();
        for (category, module_type) in &settings.module_dirs {
            let pattern = format!(
                "{}/{}/*/{}",
                Pattern::escape(&root.to_string_lossy()),
                Pattern::escape(category),
                Pattern::escape(&settings.manifest_file)
            );

            let paths = glob::glob_with(&pattern, options)
                .with_context(|| format!("Invalid module discovery pattern: {}", pattern))?;

            for entry in paths {
                match entry {
                    Ok(manifest_path) => {
                        if let Some(dir) = manifest_path.parent() {
                            candidates.push((dir.to_path_buf(), module_type.clone()));
                        }
                    }
                    Err(e) => warn!("Skipping unreadable path during discovery: {}", e),
                }
            }
        }

        candidates.sort();

        let mut seen = HashSet::new();
        let mut modules = Vec::with_capacity(candidates.len());
        let mut issues = Vec::new();

        for (dir, module_type) in candidates {
            let module = load_module(&dir, &module_type, settings);
            if !seen.insert(normalize_name(&module.name)) {
                let msg = format!(
                    "Duplicate module name '{}' at {} ignored",
                    module.name,
                    dir.display()
                );
                warn!("{}", msg);
                issues.push(msg);
                continue;
            }
            modules.push(module);
        }

        debug!("Discovered {} module(s) under {}", modules.len(), root.display());

        let mut registry = Self::from_modules(root, modules);
        registry.issues = issues;
        Ok(registry)
    }

    /// All modules, ordered by name
    pub fn list_modules(&self) -> &[Module] {
        &self.modules
    }

    /// Look up a module by name (case-insensitive)
    pub fn get_module(&self, name: &str) -> Result<&Module, ToolError> {
        let wanted = normalize_name(name);
        self.modules
            .iter()
            .find(|m| normalize_name(&m.name) == wanted)
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
                suggestions: self.suggest(&wanted),
            })
    }

    /// Whether a module with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get_module(name).is_ok()
    }

    /// Modules whose type is in `types`; all modules when `types` is empty
    pub fn filter_by_types(&self, types: &[String]) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| types.is_empty() || types.iter().any(|t| t == &m.module_type))
            .collect()
    }

    /// Normalized names of every module, for import classification
    pub fn known_names(&self) -> BTreeSet<String> {
        self.modules.iter().map(|m| normalize_name(&m.name)).collect()
    }

    /// Get the workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn suggest(&self, wanted: &str) -> Vec<String> {
        let mut scored: Vec<(f64, &str)> = self
            .modules
            .iter()
            .map(|m| (strsim::jaro_winkler(wanted, &normalize_name(&m.name)), m.name.as_str()))
            .filter(|(score, _)| *score >= 0.8)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

/// Load a single module directory. Never fails: problems become issues.
fn load_module(dir: &Path, default_type: &str, settings: &WorkspaceSettings) -> Module {
    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let mut issues = Vec::new();
    let manifest_path = dir.join(&settings.manifest_file);

    let file = match ManifestFile::load(&manifest_path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Malformed manifest {}: {}", manifest_path.display(), e);
            issues.push(ModuleIssue::new(
                ErrorKind::ParseError,
                format!("{}: {}", settings.manifest_file, e),
            ));
            ManifestFile::default()
        }
    };

    let (mut manifest, warnings) = file.to_manifest();
    for msg in warnings {
        issues.push(ModuleIssue::new(
            ErrorKind::ParseError,
            format!("{}: {}", settings.manifest_file, msg),
        ));
    }

    let requirements_path = dir.join(&settings.requirements_file);
    if requirements_path.is_file() {
        match fs::read_to_string(&requirements_path) {
            Ok(content) => {
                let (requirements, warnings) = parse_requirements(&content);
                for req in requirements {
                    manifest.declare_external(&req.name, req.constraint);
                }
                for msg in warnings {
                    issues.push(ModuleIssue::new(
                        ErrorKind::ParseError,
                        format!("{}: {}", settings.requirements_file, msg),
                    ));
                }
            }
            Err(e) => {
                warn!("Failed to read {}: {}", requirements_path.display(), e);
                issues.push(ModuleIssue::new(
                    ErrorKind::IoError,
                    format!("{}: {}", settings.requirements_file, e),
                ));
            }
        }
    }

    let name = file
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(dir_name);

    let module_type = file
        .module_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_type)
        .to_string();

    let git_root = match file.git_root.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(rel) => dir.join(rel),
        None => dir.to_path_buf(),
    };

    Module {
        name,
        module_type,
        root_path: dir.to_path_buf(),
        git_root,
        manifest,
        version: file.version_string(),
        repo_url: file.repo_url.clone(),
        issues,
    }
}
