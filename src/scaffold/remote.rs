//! Remote repository creation (GitHub REST API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Account that can own a new repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoOwner {
    #[serde(rename = "type")]
    pub owner_type: OwnerType,
    pub login: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    User,
    Org,
}

/// What to create on the host
#[derive(Debug, Clone)]
pub struct RepoSpec {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
}

/// A repository the host created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRepo {
    /// Browser URL, recorded in the manifest
    pub html_url: String,
    /// URL used for the `origin` remote
    pub clone_url: String,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(
        "No GitHub token found for {0}. Run `gh auth login` or set GH_TOKEN / GITHUB_TOKEN."
    )]
    MissingToken(String),

    #[error("Repository '{0}' already exists")]
    AlreadyExists(String),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Short machine-readable code for tool responses
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::MissingToken(_) => "missing_token",
            RemoteError::AlreadyExists(_) => "already_exists",
            RemoteError::Api { .. } => "api_error",
            RemoteError::Transport(_) => "network_error",
            RemoteError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Repository hosting provider
#[async_trait]
pub trait RepoHost: Send + Sync {
    async fn create_repository(&self, spec: &RepoSpec) -> Result<CreatedRepo, RemoteError>;

    /// The authenticated user followed by their organizations
    async fn list_owners(&self) -> Result<Vec<RepoOwner>, RemoteError>;
}

/// Outcome of remote creation, reported next to the local result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_owners: Vec<RepoOwner>,
}

impl RepoResult {
    pub fn created(url: String) -> Self {
        Self {
            success: true,
            url: Some(url),
            ..Self::default()
        }
    }

    pub fn failed(error: &RemoteError) -> Self {
        Self {
            success: false,
            error: Some(error.code().to_string()),
            message: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// `create_repo` was requested without an owner
    pub fn owner_required(owners: Result<Vec<RepoOwner>, RemoteError>) -> Self {
        let (message, available_owners) = match owners {
            Ok(owners) => (
                "Specify 'owner' to create the remote repository".to_string(),
                owners,
            ),
            Err(e) => (
                format!("Specify 'owner' to create the remote repository. Failed to list owners: {}", e),
                Vec::new(),
            ),
        };
        Self {
            success: false,
            url: None,
            error: Some("owner_required".to_string()),
            message: Some(message),
            available_owners,
        }
    }
}

/// GitHub REST API client
#[derive(Clone)]
pub struct GithubHost {
    api_url: String,
    token: Option<String>,
    client: ureq::Agent,
}

impl GithubHost {
    /// Client that resolves its token on first use
    pub fn new(api_url: impl Into<String>) -> Self {
        let client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut host = Self::new(api_url);
        host.token = Some(token.into());
        host
    }

    fn token(&self) -> Result<String, RemoteError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let host = host_from_api_url(&self.api_url);
        resolve_token(&host).ok_or(RemoteError::MissingToken(host))
    }

    fn request(&self, method: &str, path: &str) -> Result<ureq::Request, RemoteError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GitHub API {} {}", method, url);
        Ok(self
            .client
            .request(method, &url)
            .set("Accept", "application/vnd.github+json")
            .set("Authorization", &format!("Bearer {}", self.token()?))
            .set("X-GitHub-Api-Version", "2022-11-28")
            .set("User-Agent", concat!("modscope/", env!("CARGO_PKG_VERSION"))))
    }

    fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let response = self.request("GET", path)?.call().map_err(map_ureq_error)?;
        response
            .into_json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    fn post_json(&self, path: &str, payload: Value) -> Result<Value, RemoteError> {
        let response = self
            .request("POST", path)?
            .send_json(payload)
            .map_err(map_ureq_error)?;
        response
            .into_json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    fn authenticated_login(&self) -> Result<String, RemoteError> {
        let user = self.get_json("/user")?;
        login_of(&user).ok_or_else(|| RemoteError::InvalidResponse("user without login".into()))
    }

    fn create_blocking(&self, spec: &RepoSpec) -> Result<CreatedRepo, RemoteError> {
        let login = self.authenticated_login()?;
        let path = if login.eq_ignore_ascii_case(&spec.owner) {
            "/user/repos".to_string()
        } else {
            format!("/orgs/{}/repos", spec.owner)
        };

        let payload = json!({
            "name": spec.name,
            "description": spec.description,
            "private": spec.private,
            "auto_init": false,
        });

        let repo = self.post_json(&path, payload).map_err(|e| match e {
            RemoteError::Api { status: 422, ref message } if message.contains("already exists") => {
                RemoteError::AlreadyExists(format!("{}/{}", spec.owner, spec.name))
            }
            other => other,
        })?;

        let field = |name: &str| repo.get(name).and_then(Value::as_str).map(str::to_string);
        match (field("html_url"), field("clone_url")) {
            (Some(html_url), Some(clone_url)) => Ok(CreatedRepo { html_url, clone_url }),
            _ => Err(RemoteError::InvalidResponse(
                "repository response without html_url/clone_url".into(),
            )),
        }
    }

    fn list_owners_blocking(&self) -> Result<Vec<RepoOwner>, RemoteError> {
        let mut owners = vec![RepoOwner {
            owner_type: OwnerType::User,
            login: self.authenticated_login()?,
        }];

        let orgs = self.get_json("/user/orgs")?;
        for org in orgs.as_array().into_iter().flatten() {
            if let Some(login) = login_of(org) {
                owners.push(RepoOwner {
                    owner_type: OwnerType::Org,
                    login,
                });
            }
        }
        Ok(owners)
    }
}

#[async_trait]
impl RepoHost for GithubHost {
    async fn create_repository(&self, spec: &RepoSpec) -> Result<CreatedRepo, RemoteError> {
        let host = self.clone();
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || host.create_blocking(&spec))
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?
    }

    async fn list_owners(&self) -> Result<Vec<RepoOwner>, RemoteError> {
        let host = self.clone();
        tokio::task::spawn_blocking(move || host.list_owners_blocking())
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?
    }
}

fn login_of(value: &Value) -> Option<String> {
    value
        .get("login")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn map_ureq_error(error: ureq::Error) -> RemoteError {
    match error {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .map(|v| api_error_message(&v))
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            RemoteError::Api { status, message }
        }
        other => RemoteError::Transport(other.to_string()),
    }
}

/// `message` plus any per-field `errors[].message` of a GitHub error body
fn api_error_message(body: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        parts.push(message.to_string());
    }
    for error in body.get("errors").and_then(Value::as_array).into_iter().flatten() {
        if let Some(message) = error.get("message").and_then(Value::as_str) {
            parts.push(message.to_string());
        }
    }
    parts.join(": ")
}

/// `https://api.github.com` -> `github.com`; `https://ghe.corp/api/v3` -> `ghe.corp`
pub fn host_from_api_url(api_url: &str) -> String {
    let without_scheme = api_url.split("://").nth(1).unwrap_or(api_url);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.strip_prefix("api.").unwrap_or(host).to_string()
}

/// Resolve a GitHub auth token for the given host.
///
/// Priority:
/// 1. `gh auth token --hostname {host}` (gh CLI)
/// 2. `GH_TOKEN` environment variable
/// 3. `GITHUB_TOKEN` environment variable
pub fn resolve_token(host: &str) -> Option<String> {
    if let Some(token) = token_from_gh_cli(host) {
        return Some(token);
    }

    ["GH_TOKEN", "GITHUB_TOKEN"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

fn token_from_gh_cli(host: &str) -> Option<String> {
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8(output.stdout).ok()?.trim().to_owned();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_derived_from_api_url() {
        assert_eq!(host_from_api_url("https://api.github.com"), "github.com");
        assert_eq!(host_from_api_url("https://ghe.corp.example/api/v3"), "ghe.corp.example");
    }

    #[test]
    fn api_error_message_collects_field_errors() {
        let body = json!({
            "message": "Repository creation failed.",
            "errors": [{"resource": "Repository", "message": "name already exists on this account"}]
        });
        assert_eq!(
            api_error_message(&body),
            "Repository creation failed.: name already exists on this account"
        );
    }

    #[test]
    fn owner_required_lists_owners() {
        let owners = vec![
            RepoOwner {
                owner_type: OwnerType::User,
                login: "octocat".into(),
            },
            RepoOwner {
                owner_type: OwnerType::Org,
                login: "adhd-org".into(),
            },
        ];
        let result = RepoResult::owner_required(Ok(owners));

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("owner_required"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["available_owners"][1]["type"], "org");
        assert_eq!(json["available_owners"][0]["login"], "octocat");
    }

    #[test]
    fn owner_required_reports_listing_failure() {
        let result = RepoResult::owner_required(Err(RemoteError::MissingToken("github.com".into())));
        assert!(result.available_owners.is_empty());
        assert!(result.message.unwrap().contains("Failed to list owners"));
    }
}
