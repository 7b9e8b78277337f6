//! New module scaffolding
//!
//! Local creation never depends on the remote host: the module directory
//! and its files are written first, and remote repository creation is
//! reported separately so it can be retried on its own.

mod remote;

pub use remote::{
    CreatedRepo, GithubHost, OwnerType, RemoteError, RepoHost, RepoOwner, RepoResult, RepoSpec,
    host_from_api_url, resolve_token,
};

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ScaffoldSettings, WorkspaceSettings};
use crate::domain::{Manifest, ManifestFile, Module};
use crate::error::ToolError;
use crate::git::GitRunner;
use crate::workspace::ModuleRegistry;

static MODULE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid module name regex"));

const GITIGNORE: &str = "\
__pycache__/
*.py[cod]
*.egg-info/
.venv/
venv/
build/
dist/
.pytest_cache/
.mypy_cache/
.ruff_cache/
.env
";

/// Input of `create_module`
#[derive(Debug, Clone)]
pub struct CreateModuleRequest {
    pub name: String,
    pub module_type: String,
    pub create_repo: bool,
    pub owner: Option<String>,
}

/// Result of a successful local creation
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldResult {
    pub module: Module,
    /// Module directory relative to the workspace root
    pub path: PathBuf,
    pub files_created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_result: Option<RepoResult>,
}

/// Creates new modules inside a workspace
pub struct ModuleScaffolder {
    root: PathBuf,
    workspace: WorkspaceSettings,
    settings: ScaffoldSettings,
    runner: Arc<dyn GitRunner>,
    host: Arc<dyn RepoHost>,
}

impl ModuleScaffolder {
    pub fn new(
        root: impl Into<PathBuf>,
        workspace: WorkspaceSettings,
        settings: ScaffoldSettings,
        runner: Arc<dyn GitRunner>,
        host: Arc<dyn RepoHost>,
    ) -> Self {
        Self {
            root: root.into(),
            workspace,
            settings,
            runner,
            host,
        }
    }

    /// Create the module directory, its files and (optionally) a remote
    /// repository. Remote failures are reported in `repo_result` and never
    /// undo the local module.
    pub async fn create(
        &self,
        registry: &ModuleRegistry,
        request: &CreateModuleRequest,
    ) -> Result<ScaffoldResult, ToolError> {
        let name = request.name.trim();
        if !MODULE_NAME_RE.is_match(name) {
            return Err(ToolError::InvalidArgument(format!(
                "module name '{}' must be snake_case (lowercase letters, digits and underscores, starting with a letter)",
                request.name
            )));
        }

        let module_type = request.module_type.trim();
        let category = self.workspace.dir_for_type(module_type).ok_or_else(|| {
            ToolError::InvalidArgument(format!(
                "module type '{}' must be one of: {}",
                module_type,
                self.workspace.module_types().join(", ")
            ))
        })?;

        if registry.contains(name) {
            return Err(ToolError::Conflict(name.to_string()));
        }

        let dir = self.root.join(category).join(name);
        claim_directory(&dir, name)?;

        let files_created = match self.write_files(&dir, name, module_type) {
            Ok(files) => files,
            Err(e) => {
                warn!("Scaffolding {} failed, removing {}: {}", name, dir.display(), e);
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!("Failed to remove {}: {}", dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        info!("Created module {} at {}", name, dir.display());

        let git_ready = self.settings.git_init && self.git_init(&dir).await;

        let mut module = Module {
            name: name.to_string(),
            module_type: module_type.to_string(),
            root_path: dir.clone(),
            git_root: dir.clone(),
            manifest: Manifest::default(),
            version: Some(self.settings.initial_version.clone()),
            repo_url: None,
            issues: Vec::new(),
        };

        let repo_result = if request.create_repo {
            Some(
                self.create_remote(&mut module, request.owner.as_deref(), git_ready)
                    .await,
            )
        } else {
            None
        };

        Ok(ScaffoldResult {
            path: dir.strip_prefix(&self.root).unwrap_or(&dir).to_path_buf(),
            module,
            files_created,
            repo_result,
        })
    }

    fn write_files(&self, dir: &Path, name: &str, module_type: &str) -> Result<Vec<String>, ToolError> {
        let manifest_path = dir.join(&self.workspace.manifest_file);
        let mut manifest = ManifestFile {
            name: Some(name.to_string()),
            module_type: Some(module_type.to_string()),
            version: Some(serde_yaml::Value::String(self.settings.initial_version.clone())),
            ..ManifestFile::default()
        };
        manifest.extra.insert(
            "created".to_string(),
            serde_yaml::Value::String(Local::now().format("%Y-%m-%d").to_string()),
        );
        manifest.save(&manifest_path).map_err(|e| ToolError::Parse {
            path: manifest_path.clone(),
            message: e.to_string(),
        })?;

        let title = name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        fs::write(dir.join("__init__.py"), format!("\"\"\"{}.\"\"\"\n", title))?;
        fs::write(
            dir.join("README.md"),
            format!(
                "# {}\n\nA workspace {} module.\n\n## Dependencies\n\nDeclared in `{}`.\n",
                title, module_type, self.workspace.manifest_file
            ),
        )?;
        fs::write(dir.join(".gitignore"), GITIGNORE)?;

        let mut files = vec![
            self.workspace.manifest_file.clone(),
            "__init__.py".to_string(),
            "README.md".to_string(),
            ".gitignore".to_string(),
        ];
        files.sort();
        Ok(files)
    }

    /// Best effort: a failed `git init` leaves a usable module behind
    async fn git_init(&self, dir: &Path) -> bool {
        match self.runner.run_git(dir, &["init"]).await {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!("git init failed in {}: {}", dir.display(), output.combined());
                false
            }
            Err(e) => {
                warn!("git init failed in {}: {}", dir.display(), e);
                false
            }
        }
    }

    async fn create_remote(&self, module: &mut Module, owner: Option<&str>, git_ready: bool) -> RepoResult {
        let Some(owner) = owner.map(str::trim).filter(|o| !o.is_empty()) else {
            return RepoResult::owner_required(self.host.list_owners().await);
        };

        let spec = RepoSpec {
            owner: owner.to_string(),
            name: module.name.clone(),
            description: Some(format!("{} module {}", module.module_type, module.name)),
            private: self.settings.visibility.eq_ignore_ascii_case("private"),
        };

        let created = match self.host.create_repository(&spec).await {
            Ok(created) => created,
            Err(e) => {
                warn!("Remote repository for {} not created: {}", module.name, e);
                return RepoResult::failed(&e);
            }
        };

        info!("Created remote repository {}", created.html_url);
        let mut result = RepoResult::created(created.html_url.clone());
        let mut problems = Vec::new();

        if git_ready {
            let added = self
                .runner
                .run_git(&module.root_path, &["remote", "add", "origin", &created.clone_url])
                .await;
            match added {
                Ok(output) if output.success() => {}
                Ok(output) => problems.push(format!("git remote add failed: {}", output.combined())),
                Err(e) => problems.push(format!("git remote add failed: {}", e)),
            }
        } else {
            problems.push("no local git repository; origin remote not configured".to_string());
        }

        let manifest_path = module.root_path.join(&self.workspace.manifest_file);
        let recorded = ManifestFile::load(&manifest_path).and_then(|mut file| {
            file.repo_url = Some(created.html_url.clone());
            file.save(&manifest_path)
        });
        match recorded {
            Ok(()) => module.repo_url = Some(created.html_url),
            Err(e) => problems.push(format!("repo_url not written to manifest: {}", e)),
        }

        if !problems.is_empty() {
            for problem in &problems {
                warn!("{}: {}", module.name, problem);
            }
            result.message = Some(problems.join("; "));
        }
        result
    }
}

/// Directory creation is the atomic claim on a module name
fn claim_directory(dir: &Path, name: &str) -> Result<(), ToolError> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(ToolError::Conflict(name.to_string())),
        Err(e) => Err(ToolError::Io(e)),
    }
}

#[cfg(test)]
mod tests;
