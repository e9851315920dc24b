//! Marketplace settings
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. `WAVEMAKER_*` environment variables
//! 2. Config file: explicit `--config` path, else `./wmx.yaml`, else
//!    `<user config dir>/config.yaml`
//! 3. Built-in defaults
//!
//! `Settings` is built once at startup and handed to each component
//! constructor. Nothing reads configuration after that.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for all settings
pub const ENV_PREFIX: &str = "WAVEMAKER_";

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "wmx.yaml";

/// Which catalog adapter backs search and lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    /// Static fixture document shipped with the crate
    Fixture,
    /// Marketplace HTTP API at `api_base_url`
    Remote,
}

impl std::str::FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixture" => Ok(Self::Fixture),
            "remote" => Ok(Self::Remote),
            other => Err(format!(
                "Unknown catalog backend '{other}'. Expected 'fixture' or 'remote'"
            )),
        }
    }
}

/// Top-level marketplace settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Marketplace API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Optional bearer token for the marketplace API
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub api_timeout: u64,

    /// Upper bound on a single repository retrieval, in seconds
    #[serde(default = "default_git_clone_timeout")]
    pub git_clone_timeout: u64,

    /// History depth for shallow retrieval (must be >= 1)
    #[serde(default = "default_git_depth")]
    pub git_depth: u32,

    /// Default base directory for installs and listings
    #[serde(default = "default_component_base_path")]
    pub component_base_path: PathBuf,

    /// Size ceiling for a single installed component
    #[serde(default = "default_max_component_size_mb")]
    pub max_component_size_mb: u64,

    /// Log verbosity (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Catalog adapter selection
    #[serde(default = "default_catalog")]
    pub catalog: CatalogBackend,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: None,
            api_timeout: default_api_timeout(),
            git_clone_timeout: default_git_clone_timeout(),
            git_depth: default_git_depth(),
            component_base_path: default_component_base_path(),
            max_component_size_mb: default_max_component_size_mb(),
            log_level: default_log_level(),
            catalog: default_catalog(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.wavemaker.com/marketplace/v1".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_git_clone_timeout() -> u64 {
    300
}

fn default_git_depth() -> u32 {
    1
}

fn default_component_base_path() -> PathBuf {
    PathBuf::from("src/main/webapp/components")
}

fn default_max_component_size_mb() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog() -> CatalogBackend {
    CatalogBackend::Fixture
}

impl Settings {
    /// Load settings from the standard sources
    ///
    /// An explicit `config_path` must exist; the implicit locations are
    /// optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::discover_config_file(),
        };

        let mut settings = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML file, filling missing keys with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content).context("Invalid settings YAML")
    }

    fn discover_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        directories::ProjectDirs::from("com", "wavemaker", "wmx")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Overlay `WAVEMAKER_*` variables using the supplied lookup
    ///
    /// The lookup is injected so tests do not have to mutate process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some(value) = var("API_KEY") {
            self.api_key = if value.is_empty() { None } else { Some(value) };
        }
        if let Some(value) = var("API_TIMEOUT") {
            self.api_timeout = parse_env_number("API_TIMEOUT", &value)?;
        }
        if let Some(value) = var("GIT_CLONE_TIMEOUT") {
            self.git_clone_timeout = parse_env_number("GIT_CLONE_TIMEOUT", &value)?;
        }
        if let Some(value) = var("GIT_DEPTH") {
            self.git_depth = parse_env_number("GIT_DEPTH", &value)?;
        }
        if let Some(value) = var("COMPONENT_BASE_PATH") {
            self.component_base_path = PathBuf::from(value);
        }
        if let Some(value) = var("MAX_COMPONENT_SIZE_MB") {
            self.max_component_size_mb = parse_env_number("MAX_COMPONENT_SIZE_MB", &value)?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some(value) = var("CATALOG") {
            self.catalog = value
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{ENV_PREFIX}CATALOG: {e}"))?;
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.git_depth == 0 {
            anyhow::bail!("git_depth must be at least 1 (shallow retrieval is required)");
        }
        if self.git_clone_timeout == 0 {
            anyhow::bail!("git_clone_timeout must be greater than zero");
        }
        if self.max_component_size_mb == 0 {
            anyhow::bail!("max_component_size_mb must be greater than zero");
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            anyhow::bail!("api_base_url must start with http:// or https://");
        }
        Ok(())
    }

    /// Size ceiling in bytes
    pub fn max_component_size_bytes(&self) -> u64 {
        self.max_component_size_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{ENV_PREFIX}{name} must be a number, got '{value}'"))
}
