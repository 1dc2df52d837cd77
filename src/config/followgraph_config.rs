//! FollowGraph configuration file handling
//!
//! Loads and manages the ~/.config/followgraph/config.yaml file.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the access credential rides on backend requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPlacement {
    /// `Authorization: Bearer <token>` header
    #[default]
    Header,

    /// `?access_token=<token>` query parameter
    Query,
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the query boundary listens on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Page size used when a caller omits `perPage`
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,
}

fn default_listen() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_per_page() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_per_page: default_per_page(),
        }
    }
}

/// FollowGraph configuration
///
/// The caller identity and credential are fixed at process start; nothing at
/// runtime changes who the viewer is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowGraphConfig {
    /// Login of the fixed caller identity
    pub login: String,

    /// Access credential; falls back to `GITHUB_TOKEN` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// REST API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub credential_placement: CredentialPlacement,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl FollowGraphConfig {
    /// Create a configuration for `login` with every other setting defaulted
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            access_token: None,
            api_url: default_api_url(),
            credential_placement: CredentialPlacement::default(),
            request_timeout_secs: default_timeout_secs(),
            server: ServerConfig::default(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Load configuration from the default path (~/.config/followgraph/config.yaml)
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        Self::load(&path)
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::FollowGraphError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading FollowGraph configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            login = %config.login,
            api_url = %config.api_url,
            listen = %config.server.listen,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save_default(&self) -> Result<()> {
        let path = Self::default_path();
        self.save(&path)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving FollowGraph configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/followgraph/config.yaml)
    pub fn default_path() -> PathBuf {
        // Always use ~/.config for consistency across platforms (macOS, Linux)
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("followgraph");
        path.push("config.yaml");
        path
    }

    /// The credential from config, or from `GITHUB_TOKEN` when the file has none
    pub fn resolve_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
