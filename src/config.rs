use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_DIR: &str = ".tasktrack";
pub const CONFIG_FILE: &str = "config.json";

pub const DATA_DIR_ENV: &str = "TASKTRACK_DATA_DIR";
pub const LOG_ENV: &str = "TASKTRACK_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub tasks_file: String,
    pub accounts_file: String,
    pub log_file: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DIR),
            tasks_file: "tasks.json".to_string(),
            accounts_file: "accounts.json".to_string(),
            log_file: "tasktrack.log".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when it does not exist, then
    /// applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&data)?
        } else {
            Self::default()
        };

        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = env::var(LOG_ENV) {
            config.log_filter = filter;
        }
        Ok(config)
    }

    /// Writes a default config into `dir`. Returns `false` when one is
    /// already there.
    pub fn init(dir: &Path) -> Result<bool, ConfigError> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            warn!(path = %config_path.display(), "Already initialized");
            return Ok(false);
        }

        let config = Self {
            data_dir: dir.to_path_buf(),
            ..Self::default()
        };
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        fs::write(&config_path, serde_json::to_string_pretty(&config)?).map_err(|source| {
            ConfigError::Io {
                path: config_path.clone(),
                source,
            }
        })?;
        info!(path = %config_path.display(), "Initialized");
        Ok(true)
    }

    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::Io {
            path: self.data_dir.clone(),
            source,
        })
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(&self.tasks_file)
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(&self.accounts_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }
}
