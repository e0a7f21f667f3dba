use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration. Every key has a default, and a missing file
/// means all defaults, so the binary works with no config at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Capacity of the update channel between engines and the dashboard.
    /// Sized to absorb normal output bursts; a full channel stalls producers
    /// rather than dropping events.
    #[serde(default = "default_update_capacity")]
    pub update_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            update_capacity: default_update_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Lower bound on the command sidebar width, in columns.
    #[serde(default = "default_min_sidebar_width")]
    pub min_sidebar_width: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            min_sidebar_width: default_min_sidebar_width(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Diagnostics go to a file: the dashboard owns the terminal.
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_update_capacity() -> usize {
    256
}

fn default_min_sidebar_width() -> u16 {
    20
}

fn default_log_file() -> String {
    "fanout.log".to_string()
}

fn default_log_filter() -> String {
    "fanout=warn".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
