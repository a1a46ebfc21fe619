use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetsConfig {
    /// Directory holding the discovery file the probing agent watches.
    #[serde(default = "default_targets_dir")]
    pub dir: PathBuf,
    /// File name of the discovery document within `dir`.
    #[serde(default = "default_targets_file")]
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_targets_dir() -> PathBuf {
    PathBuf::from("/targets")
}

fn default_targets_file() -> String {
    "hosts.json".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            dir: default_targets_dir(),
            file: default_targets_file(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply the `TARGETS_DIR` environment override, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("TARGETS_DIR") {
            if !dir.is_empty() {
                self.targets.dir = PathBuf::from(dir);
            }
        }
    }

    /// Full path of the discovery file.
    pub fn targets_path(&self) -> PathBuf {
        self.targets.dir.join(&self.targets.file)
    }
}
