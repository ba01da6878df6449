//! CLI configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_PATH;
use crate::panels::PanelOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: String,
    pub base_path: String,
    pub default_output: String,
    pub token: Option<String>,
    pub page_size: usize,
    pub stale_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            default_output: "table".to_string(),
            token: None,
            page_size: crate::table::DEFAULT_PAGE_SIZE,
            stale_secs: crate::query::DEFAULT_STALE_TIME.as_secs(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load `~/.config/dbadmin/cli.toml`, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config/dbadmin/cli.toml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn panel_options(&self) -> PanelOptions {
        PanelOptions {
            page_size: self.page_size.max(1),
            stale_time: Duration::from_secs(self.stale_secs),
        }
    }
}
