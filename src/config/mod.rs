//! Configuration management for coursegate

pub mod cache;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub use cache::SessionCache;

/// Environment variable overriding the API root
pub const API_URL_ENV: &str = "COURSEGATE_API_URL";
/// Environment variable supplying the bearer token
pub const API_TOKEN_ENV: &str = "COURSEGATE_API_TOKEN";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the platform API
    pub api_base_url: String,

    /// Bearer token from the auth layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Interval between background refreshes of counters and progress
    pub refresh_interval_secs: u64,

    /// Entries shown in the recent activity feed
    pub recent_activity_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            request_timeout_secs: 30,
            refresh_interval_secs: 60,
            recent_activity_limit: 10,
        }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Apply environment overrides through the given lookup
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_token = Some(token);
        }
        self
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "coursegate")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "coursegate")
            .context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get the session cache directory path
    pub fn cache_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("cache"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_refreshes_every_minute() {
        let config = Config::default();
        assert_eq!(config.refresh_interval_secs, 60);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn config_deserializes_partial_json() {
        let json = r#"{"api_base_url":"https://edu.example/api","recent_activity_limit":5}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_base_url, "https://edu.example/api");
        assert_eq!(config.recent_activity_limit, 5);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn token_is_not_written_when_absent() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(!json.contains("api_token"));
    }

    #[test]
    fn env_overrides_apply() {
        let config = Config::default().with_env_overrides(|key| match key {
            API_URL_ENV => Some("https://override/api".into()),
            API_TOKEN_ENV => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://override/api");
        assert!(config.api_token.is_none());
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.recent_activity_limit, 10);

        let mut changed = config;
        changed.refresh_interval_secs = 15;
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().refresh_interval_secs, 15);
    }
}
