use super::*;
use crate::error::ErrorKind;
use crate::git::SystemGit;
use async_trait::async_trait;
use std::sync::Mutex;
use tempfile::TempDir;

/// Host whose every call fails
struct UnreachableHost;

#[async_trait]
impl RepoHost for UnreachableHost {
    async fn create_repository(&self, _spec: &RepoSpec) -> Result<CreatedRepo, RemoteError> {
        Err(RemoteError::Transport("connection refused".into()))
    }

    async fn list_owners(&self) -> Result<Vec<RepoOwner>, RemoteError> {
        Err(RemoteError::Transport("connection refused".into()))
    }
}

/// Host that records requests and pretends to succeed
#[derive(Default)]
struct RecordingHost {
    created: Mutex<Vec<String>>,
}

#[async_trait]
impl RepoHost for RecordingHost {
    async fn create_repository(&self, spec: &RepoSpec) -> Result<CreatedRepo, RemoteError> {
        self.created
            .lock()
            .unwrap()
            .push(format!("{}/{}", spec.owner, spec.name));
        Ok(CreatedRepo {
            html_url: format!("https://github.com/{}/{}", spec.owner, spec.name),
            clone_url: format!("https://github.com/{}/{}.git", spec.owner, spec.name),
        })
    }

    async fn list_owners(&self) -> Result<Vec<RepoOwner>, RemoteError> {
        Ok(vec![RepoOwner {
            owner_type: OwnerType::User,
            login: "octocat".into(),
        }])
    }
}

fn scaffolder(root: &Path, host: Arc<dyn RepoHost>) -> ModuleScaffolder {
    ModuleScaffolder::new(
        root,
        WorkspaceSettings::default(),
        ScaffoldSettings::default(),
        Arc::new(SystemGit::default()),
        host,
    )
}

fn request(name: &str, module_type: &str) -> CreateModuleRequest {
    CreateModuleRequest {
        name: name.to_string(),
        module_type: module_type.to_string(),
        create_repo: false,
        owner: None,
    }
}

fn empty_registry(root: &Path) -> ModuleRegistry {
    ModuleRegistry::load(root, &WorkspaceSettings::default()).unwrap()
}

#[tokio::test]
async fn creates_module_files_and_registry_sees_it() {
    let tmp = TempDir::new().unwrap();
    let scaffolder = scaffolder(tmp.path(), Arc::new(UnreachableHost));

    let result = scaffolder
        .create(&empty_registry(tmp.path()), &request("cache_manager", "manager"))
        .await
        .unwrap();

    assert_eq!(result.path, PathBuf::from("managers/cache_manager"));
    assert_eq!(
        result.files_created,
        vec![".gitignore", "README.md", "__init__.py", "init.yaml"]
    );
    assert!(result.repo_result.is_none());

    let dir = tmp.path().join("managers/cache_manager");
    assert!(dir.join(".git").exists());
    let readme = fs::read_to_string(dir.join("README.md")).unwrap();
    assert!(readme.starts_with("# Cache Manager"));

    let registry = empty_registry(tmp.path());
    let module = registry.get_module("cache_manager").unwrap();
    assert_eq!(module.module_type, "manager");
    assert_eq!(module.version.as_deref(), Some("0.1.0"));
    assert!(module.issues.is_empty());
    assert!(module.manifest.is_empty());
}

#[tokio::test]
async fn failing_remote_keeps_local_module() {
    let tmp = TempDir::new().unwrap();
    let scaffolder = scaffolder(tmp.path(), Arc::new(UnreachableHost));
    let mut req = request("sync_util", "util");
    req.create_repo = true;
    req.owner = Some("adhd-org".into());

    let result = scaffolder
        .create(&empty_registry(tmp.path()), &req)
        .await
        .unwrap();

    let repo = result.repo_result.unwrap();
    assert!(!repo.success);
    assert_eq!(repo.error.as_deref(), Some("network_error"));
    assert!(tmp.path().join("utils/sync_util/init.yaml").is_file());
    assert!(empty_registry(tmp.path()).contains("sync_util"));
}

#[tokio::test]
async fn missing_owner_lists_available_owners() {
    let tmp = TempDir::new().unwrap();
    let scaffolder = scaffolder(tmp.path(), Arc::new(RecordingHost::default()));
    let mut req = request("voice_plugin", "plugin");
    req.create_repo = true;

    let result = scaffolder
        .create(&empty_registry(tmp.path()), &req)
        .await
        .unwrap();

    let repo = result.repo_result.unwrap();
    assert_eq!(repo.error.as_deref(), Some("owner_required"));
    assert_eq!(repo.available_owners.len(), 1);
    assert!(tmp.path().join("plugins/voice_plugin").is_dir());
}

#[tokio::test]
async fn successful_remote_records_repo_url() {
    let tmp = TempDir::new().unwrap();
    let host = Arc::new(RecordingHost::default());
    let scaffolder = scaffolder(tmp.path(), host.clone());
    let mut req = request("search_mcp", "mcp");
    req.create_repo = true;
    req.owner = Some("octocat".into());

    let result = scaffolder
        .create(&empty_registry(tmp.path()), &req)
        .await
        .unwrap();

    let repo = result.repo_result.unwrap();
    assert!(repo.success, "{:?}", repo);
    assert_eq!(repo.url.as_deref(), Some("https://github.com/octocat/search_mcp"));
    assert_eq!(host.created.lock().unwrap().as_slice(), ["octocat/search_mcp"]);

    let module = empty_registry(tmp.path()).get_module("search_mcp").unwrap().clone();
    assert_eq!(module.repo_url.as_deref(), Some("https://github.com/octocat/search_mcp"));
}

#[tokio::test]
async fn rejects_invalid_names_and_types() {
    let tmp = TempDir::new().unwrap();
    let scaffolder = scaffolder(tmp.path(), Arc::new(UnreachableHost));
    let registry = empty_registry(tmp.path());

    for bad in ["CacheManager", "9lives", "cache-manager", ""] {
        let err = scaffolder.create(&registry, &request(bad, "manager")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "name {:?}", bad);
    }

    let err = scaffolder
        .create(&registry, &request("thing", "service"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(!tmp.path().join("managers").exists());
}

#[tokio::test]
async fn existing_module_is_a_conflict() {
    let tmp = TempDir::new().unwrap();
    let scaffolder = scaffolder(tmp.path(), Arc::new(UnreachableHost));

    scaffolder
        .create(&empty_registry(tmp.path()), &request("cache_manager", "manager"))
        .await
        .unwrap();

    // Known to the registry
    let err = scaffolder
        .create(&empty_registry(tmp.path()), &request("cache_manager", "manager"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Directory exists but registry is stale
    fs::create_dir_all(tmp.path().join("utils/taken_util")).unwrap();
    let err = scaffolder
        .create(&empty_registry(tmp.path()), &request("taken_util", "util"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
