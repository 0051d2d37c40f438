//! Configuration management for wordcloud-tools.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/wordcloud-tools/config.toml`
//! - **Windows**: `%APPDATA%\wordcloud-tools\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use wordcloud_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("viewer.port", "9000")?;
//! config.save()?;
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config and data directory name.
const APP_DIR_NAME: &str = "wordcloud-tools";

/// Snapshot file name inside the data directory.
const SNAPSHOT_FILE_NAME: &str = "words.json";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

/// MCP server identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name announced in `serverInfo`
    #[serde(default = "default_server_name")]
    pub name: String,
}

/// Where the cloud snapshot is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Snapshot JSON file (defaults to the platform data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Browser viewer (HTTP + SSE) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Start the viewer alongside the stdio server
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static page served at `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
    /// How long an idle event stream waits before re-checking its connection
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Paths to files owned by other applications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// Claude Desktop config, read by `add_mcp_servers`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_desktop_config: Option<PathBuf>,
}

fn default_server_name() -> String {
    "word-cloud-manager".to_string()
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_idle_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            index_path: None,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl ViewerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL a browser should open.
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Resolved snapshot file path.
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME).join(SNAPSHOT_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Resolved Claude Desktop config path, if the platform has one.
    pub fn claude_desktop_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.integrations.claude_desktop_config {
            return Some(path.clone());
        }
        dirs::config_dir().map(|p| p.join("Claude").join("claude_desktop_config.json"))
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `viewer.port`, `storage.path`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match (section, field) {
            ("server", "name") => self.server.name = value.to_string(),
            ("storage", "path") => self.storage.path = Some(PathBuf::from(value)),
            ("viewer", "enabled") => self.viewer.enabled = parse_value(key, value)?,
            ("viewer", "host") => self.viewer.host = value.to_string(),
            ("viewer", "port") => self.viewer.port = parse_value(key, value)?,
            ("viewer", "index_path") => self.viewer.index_path = Some(PathBuf::from(value)),
            ("viewer", "idle_timeout_secs") => {
                self.viewer.idle_timeout_secs = parse_value(key, value)?
            }
            ("integrations", "claude_desktop_config") => {
                self.integrations.claude_desktop_config = Some(PathBuf::from(value))
            }
            ("server" | "storage" | "viewer" | "integrations", _) => {
                return Err(Error::Config(format!(
                    "Unknown {} config field: {}",
                    section, field
                )))
            }
            _ => return Err(Error::Config(format!("Unknown section: {}", section))),
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `viewer.port`, `storage.path`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        let display = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());

        match (section, field) {
            ("server", "name") => Ok(Some(self.server.name.clone())),
            ("storage", "path") => Ok(display(&self.storage.path)),
            ("viewer", "enabled") => Ok(Some(self.viewer.enabled.to_string())),
            ("viewer", "host") => Ok(Some(self.viewer.host.clone())),
            ("viewer", "port") => Ok(Some(self.viewer.port.to_string())),
            ("viewer", "index_path") => Ok(display(&self.viewer.index_path)),
            ("viewer", "idle_timeout_secs") => Ok(Some(self.viewer.idle_timeout_secs.to_string())),
            ("integrations", "claude_desktop_config") => {
                Ok(display(&self.integrations.claude_desktop_config))
            }
            ("server" | "storage" | "viewer" | "integrations", _) => Err(Error::Config(format!(
                "Unknown {} config field: {}",
                section, field
            ))),
            _ => Err(Error::Config(format!("Unknown section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value '{}' for {}", value, key)))
}

// =============================================================================
// Tests
// =============================================================================
