//! Configuration file support for NurseFlow.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/nurseflow/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub ai: AiConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Alert evaluation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Doses older than this many hours are silently skipped.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,

    /// Seconds between evaluation ticks.
    #[serde(default = "default_period_seconds")]
    pub period_seconds: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            period_seconds: default_period_seconds(),
        }
    }
}

/// Drug-info lookup configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of an Ollama-compatible endpoint.
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("nurseflow")
}

fn default_window_hours() -> i64 {
    crate::alert::DEFAULT_WINDOW_HOURS
}

fn default_period_seconds() -> u64 {
    crate::alert::EVALUATION_PERIOD.as_secs()
}

fn default_ai_endpoint() -> String {
    "http://localhost:11434".into()
}

fn default_ai_model() -> String {
    "medgemma".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("nurseflow").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
