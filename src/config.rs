// Configuration management

use crate::error::{CheckError, Result};
use crate::systemd::DataSourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Site wide defaults, overridden by command line flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_source: DataSourceKind,
    pub with_user_units: bool,
    pub performance_data: bool,
    pub startup_time_warning: u64,
    pub startup_time_critical: u64,
    pub timers_warning: u64,
    pub timers_critical: u64,
    /// Exclude regexes applied in addition to `--exclude`
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DataSourceKind::Cli,
            with_user_units: false,
            performance_data: true,
            startup_time_warning: 60,
            startup_time_critical: 120,
            timers_warning: 6 * 24 * 60 * 60,
            timers_critical: 7 * 24 * 60 * 60,
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Get default config path: ~/.config/check_systemd/config.yaml
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CheckError::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("check_systemd").join("config.yaml"))
    }

    /// Load config from path, falling back to defaults if not found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("{:#}, using built-in defaults", e);
                    return Ok(Self::default());
                }
            },
        };

        if config_path.exists() {
            let config = Self::from_file(&config_path)?;
            tracing::info!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            tracing::debug!("No configuration file at {}", config_path.display());
            Ok(Self::default())
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(CheckError::Io)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CheckError::Config(format!("{}: {}", path.display(), e)).into())
    }
}
