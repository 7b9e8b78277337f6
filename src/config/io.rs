//! Configuration file lookup

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.modscope/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".modscope")
    }

    /// Get the global config file path (~/.modscope/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration for a workspace root.
    /// Looks for: .modscope/config.toml, modscope.toml, then ~/.modscope/config.toml
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(".modscope").join("config.toml"),
            dir.join("modscope.toml"),
            Self::global_config_path(),
        ];

        for path in &candidates {
            if path.exists() {
                debug!("Using config file {}", path.display());
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Resolve the configuration, preferring an explicit file when given
    pub fn resolve(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::from_dir(dir),
        }
    }
}
