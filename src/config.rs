// Configuration loaded from YAML

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "taskindex";
const CONFIG_FILE: &str = "config.yml";
const TASKS_FILE: &str = "tasks.jsonl";

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task file; falls back to `<data_dir>/taskindex/tasks.jsonl`
    pub tasks_file: Option<PathBuf>,
    /// Max log level written to stderr
    pub log_level: String,
    /// Filter used by `list` when none is given
    pub default_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_file: None,
            log_level: "warn".to_string(),
            default_filter: "pending".to_string(),
        }
    }
}

impl Config {
    /// Load config from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(file = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load config from the default location
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Task file to use, given an optional command-line override
    pub fn resolve_tasks_file(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.tasks_file {
            return Ok(path.clone());
        }
        default_tasks_path().ok_or_else(|| eyre::eyre!("Could not determine data directory; pass --file"))
    }
}

/// `<config_dir>/taskindex/config.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// `<data_dir>/taskindex/tasks.jsonl`
pub fn default_tasks_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR).join(TASKS_FILE))
}
