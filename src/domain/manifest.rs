//! Module manifest: the declared-dependency document of a module

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Error type for manifest reading
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Declared dependencies of a module, normalized for comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Workspace modules this module depends on
    pub declared_internal: BTreeSet<String>,
    /// Third-party packages with their opaque version constraint
    pub declared_external: BTreeMap<String, Option<String>>,
}

impl Manifest {
    /// Declare an internal dependency given as a module name or repository URL
    pub fn declare_internal(&mut self, entry: &str) {
        if let Some(name) = internal_name_from_entry(entry) {
            self.declared_internal.insert(name);
        }
    }

    /// Declare an external package. A later declaration only fills in a
    /// missing constraint, it never drops one.
    pub fn declare_external(&mut self, name: &str, constraint: Option<String>) {
        let name = normalize_name(name);
        if name.is_empty() {
            return;
        }
        let slot = self.declared_external.entry(name).or_insert(None);
        if slot.is_none() {
            *slot = constraint;
        }
    }

    /// Normalized external package names
    pub fn external_names(&self) -> BTreeSet<String> {
        self.declared_external.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.declared_internal.is_empty() && self.declared_external.is_empty()
    }
}

/// Normalize a module or package name for comparison.
///
/// Case-insensitive, and `-`, `.` and `_` are interchangeable
/// (`PyYAML` == `pyyaml`, `python-dateutil` == `python_dateutil`).
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Reduce an internal requirement entry to a module name.
/// `https://github.com/org/logger_util.git` -> `logger_util`
pub fn internal_name_from_entry(entry: &str) -> Option<String> {
    let trimmed = entry.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    let name = normalize_name(last);
    if name.is_empty() { None } else { Some(name) }
}

/// A single pip-style requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub constraint: Option<String>,
}

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*(.*)$")
        .expect("requirement regex is valid")
});

static EGG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#egg=([A-Za-z0-9][A-Za-z0-9._-]*)").expect("egg regex is valid"));

/// Parse one requirement line.
///
/// Returns `Ok(None)` for lines that carry no requirement (blank, comment,
/// pip options) and `Err` with a message for lines that cannot be understood.
pub fn parse_requirement_line(line: &str) -> Result<Option<Requirement>, String> {
    let line = line.split(" #").next().unwrap_or("").trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return Ok(None);
    }

    if line.contains("://") {
        return match EGG_RE.captures(line) {
            Some(caps) => Ok(Some(Requirement {
                name: caps[1].to_string(),
                constraint: None,
            })),
            None => Err(format!("URL requirement without #egg= name: {}", line)),
        };
    }

    // Environment markers are irrelevant for the declared set
    let spec = line.split(';').next().unwrap_or("").trim();

    let caps = REQUIREMENT_RE
        .captures(spec)
        .ok_or_else(|| format!("Unrecognized requirement: {}", line))?;

    let constraint = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(Some(Requirement {
        name: caps[1].to_string(),
        constraint,
    }))
}

/// Parse a requirements file body; unparseable lines are returned as warnings
pub fn parse_requirements(content: &str) -> (Vec<Requirement>, Vec<String>) {
    let mut requirements = Vec::new();
    let mut warnings = Vec::new();

    for line in content.lines() {
        match parse_requirement_line(line) {
            Ok(Some(req)) => requirements.push(req),
            Ok(None) => {}
            Err(msg) => warnings.push(msg),
        }
    }

    (requirements, warnings)
}

/// On-disk manifest document (`init.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,

    /// Kept as a raw value: `version: 1.0` is a float to YAML
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Repository checkout relative to the module directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_root: Option<String>,

    /// Internal modules, by name or repository URL
    #[serde(default)]
    pub requirements: Vec<String>,

    /// External packages as requirement specifiers
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Keys this tool does not interpret, preserved on rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ManifestFile {
    /// Read and parse a manifest file. An empty file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write the manifest back to disk
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn version_string(&self) -> Option<String> {
        match self.version.as_ref()? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Build the comparable manifest. Unparseable dependency entries are
    /// returned as warnings rather than failing the whole manifest.
    pub fn to_manifest(&self) -> (Manifest, Vec<String>) {
        let mut manifest = Manifest::default();
        let mut warnings = Vec::new();

        for entry in &self.requirements {
            manifest.declare_internal(entry);
        }

        for entry in &self.dependencies {
            match parse_requirement_line(entry) {
                Ok(Some(req)) => manifest.declare_external(&req.name, req.constraint),
                Ok(None) => {}
                Err(msg) => warnings.push(msg),
            }
        }

        (manifest, warnings)
    }
}
