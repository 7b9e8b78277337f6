//! The four workspace tools
//!
//! Every call loads a fresh registry from disk, so results always reflect
//! the live workspace and nothing is shared between calls.

mod responses;

pub use responses::{
    CreateModuleArgs, CreateModuleResponse, ErrorResponse, GitModulesArgs, GitModulesResponse,
    ListModulesArgs, ListModulesResponse, ModuleInfoArgs, ModuleInfoResponse, ModuleSummary,
};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::deps;
use crate::error::{ErrorKind, ToolError};
use crate::git::{CancellationWatcher, GitAggregator, GitManager, GitParams, GitRunner, SystemGit};
use crate::scaffold::{CreateModuleRequest, GithubHost, ModuleScaffolder, RepoHost};
use crate::scanner::ImportScanner;
use crate::workspace::ModuleRegistry;

/// Names of the tools, in catalog order
pub const TOOL_NAMES: [&str; 4] = ["list_modules", "get_module_info", "create_module", "git_modules"];

/// Entry point shared by the CLI and the stdio server
#[derive(Clone)]
pub struct ToolService {
    root: PathBuf,
    config: Config,
    runner: Arc<dyn GitRunner>,
    host: Arc<dyn RepoHost>,
}

impl ToolService {
    /// Service backed by the system `git` and the GitHub API
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let runner = Arc::new(SystemGit::new(Duration::from_secs(config.git.timeout_secs)));
        let host = Arc::new(GithubHost::new(config.scaffold.github_api_url.clone()));
        Self::with_collaborators(root, config, runner, host)
    }

    pub fn with_collaborators(
        root: impl Into<PathBuf>,
        config: Config,
        runner: Arc<dyn GitRunner>,
        host: Arc<dyn RepoHost>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
            host,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn registry(&self) -> Result<ModuleRegistry, ToolError> {
        Ok(ModuleRegistry::load(&self.root, &self.config.workspace)?)
    }

    /// All modules, optionally with their imports and dependency findings
    pub async fn list_modules(&self, args: ListModulesArgs) -> Result<ListModulesResponse, ToolError> {
        let registry = self.registry()?;
        let selected: Vec<_> = registry
            .filter_by_types(&args.types)
            .into_iter()
            .cloned()
            .collect();

        let root = self.root.clone();
        let scan_settings = self.config.scan.clone();
        let with_imports = args.with_imports;
        let registry_issues = registry.issues().to_vec();

        let modules = tokio::task::spawn_blocking(move || {
            let scanner = with_imports.then(|| ImportScanner::new(&registry, &scan_settings));
            selected
                .iter()
                .map(|module| {
                    let mut summary = ModuleSummary::new(module, &root);
                    if let Some(scanner) = &scanner {
                        let report = scanner.scan(module);
                        summary.findings =
                            Some(deps::compare(&module.name, &report.imports, &module.manifest));
                        summary.imports = Some(report.imports);
                        summary.scan_issues = Some(report.issues);
                    }
                    summary
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ToolError::Other(anyhow::anyhow!("module scan task failed: {}", e)))?;

        info!("list_modules: {} module(s)", modules.len());

        Ok(ListModulesResponse {
            success: true,
            count: modules.len(),
            modules,
            registry_issues,
        })
    }

    /// Full picture of one module: imports, findings and git status
    pub async fn get_module_info(&self, name: &str) -> Result<ModuleInfoResponse, ToolError> {
        let registry = self.registry()?;
        let module = registry.get_module(name)?.clone();

        let scan_settings = self.config.scan.clone();
        let scanned = module.clone();
        let report = tokio::task::spawn_blocking(move || {
            ImportScanner::new(&registry, &scan_settings).scan(&scanned)
        })
        .await
        .map_err(|e| ToolError::Other(anyhow::anyhow!("module scan task failed: {}", e)))?;

        let findings = deps::compare(&module.name, &report.imports, &module.manifest);

        let status = match GitManager::open(&module.git_root, self.runner.clone()).await {
            Ok(manager) => manager.status(&self.config.git.remote).await,
            Err(e) => Err(e),
        };
        let (git_status, git_error) = match status {
            Ok(status) => (Some(status), None),
            Err(e) => {
                warn!("git status unavailable for {}: {}", module.name, e);
                (None, Some(ErrorResponse::new(e.kind(), e.to_string())))
            }
        };

        Ok(ModuleInfoResponse {
            success: true,
            module: ModuleSummary::new(&module, &self.root),
            imports: report.imports,
            stdlib: report.stdlib,
            local: report.local,
            scan_issues: report.issues,
            git_status,
            git_error,
            findings,
        })
    }

    /// Scaffold a new module, optionally with a remote repository
    pub async fn create_module(&self, args: CreateModuleArgs) -> Result<CreateModuleResponse, ToolError> {
        let registry = self.registry()?;
        let scaffolder = ModuleScaffolder::new(
            &self.root,
            self.config.workspace.clone(),
            self.config.scaffold.clone(),
            self.runner.clone(),
            self.host.clone(),
        );

        let request = CreateModuleRequest {
            name: args.name,
            module_type: args.module_type,
            create_repo: args.create_repo,
            owner: args.owner,
        };
        let result = scaffolder.create(&registry, &request).await?;

        Ok(CreateModuleResponse {
            success: true,
            module: ModuleSummary::new(&result.module, &self.root),
            path: result.path,
            files_created: result.files_created,
            repo_result: result.repo_result,
        })
    }

    /// Run one git action across the selected modules
    pub async fn git_modules(
        &self,
        args: GitModulesArgs,
        cancel: &CancellationWatcher,
    ) -> Result<GitModulesResponse, ToolError> {
        let registry = self.registry()?;

        let modules: Vec<_> = match args.module_name.as_deref() {
            Some(name) => vec![registry.get_module(name)?.clone()],
            None => registry
                .filter_by_types(&args.types)
                .into_iter()
                .cloned()
                .collect(),
        };

        let params = GitParams {
            commit_message: args.commit_message,
        };

        let aggregator = GitAggregator::new(self.runner.clone(), &self.config.git);
        let outcomes = aggregator.run(args.action, &modules, &params, cancel).await;

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            "git_modules {}: {} module(s), {} failed",
            args.action,
            outcomes.len(),
            failed
        );

        Ok(GitModulesResponse {
            success: failed == 0,
            action: args.action,
            count: outcomes.len(),
            outcomes,
        })
    }

    /// Dispatch a tool by name with JSON arguments; always returns the JSON result
    pub async fn call(&self, tool: &str, arguments: Value, cancel: &CancellationWatcher) -> Value {
        match tool {
            "list_modules" => match parse_args::<ListModulesArgs>(arguments) {
                Ok(args) => respond(self.list_modules(args).await),
                Err(e) => respond::<ListModulesResponse>(Err(e)),
            },
            "get_module_info" => match parse_args::<ModuleInfoArgs>(arguments) {
                Ok(args) => respond(self.get_module_info(&args.name).await),
                Err(e) => respond::<ModuleInfoResponse>(Err(e)),
            },
            "create_module" => match parse_args::<CreateModuleArgs>(arguments) {
                Ok(args) => respond(self.create_module(args).await),
                Err(e) => respond::<CreateModuleResponse>(Err(e)),
            },
            "git_modules" => match parse_args::<GitModulesArgs>(arguments) {
                Ok(args) => respond(self.git_modules(args, cancel).await),
                Err(e) => respond::<GitModulesResponse>(Err(e)),
            },
            other => error_value(&ErrorResponse::new(
                ErrorKind::InvalidArgument,
                format!("Unknown tool '{}'; available: {}", other, TOOL_NAMES.join(", ")),
            )),
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}

fn respond<T: Serialize>(result: Result<T, ToolError>) -> Value {
    match result {
        Ok(response) => serde_json::to_value(response).unwrap_or_else(|e| {
            error_value(&ErrorResponse::new(
                ErrorKind::IoError,
                format!("Failed to serialize response: {}", e),
            ))
        }),
        Err(e) => {
            warn!("Tool call failed: {}", e);
            error_value(&ErrorResponse::from(&e))
        }
    }
}

fn error_value(response: &ErrorResponse) -> Value {
    serde_json::to_value(response).unwrap_or_else(|_| {
        json!({ "success": false, "error": response.error.as_str(), "message": response.message })
    })
}
