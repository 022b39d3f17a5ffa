use crate::error::{BackstopError, Result};
use crate::overdue::DEFAULT_ALERT_THRESHOLD_DAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

const APP_NAME: &str = "backstop";
const DB_ENV_VAR: &str = "BACKSTOP_DB";

/// Values read from `backstop.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    #[serde(default = "default_threshold")]
    pub alert_threshold_days: i64,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Persistent log file. Defaults to the XDG state file
    /// `backstop/backstop.log`.
    pub log_file: Option<PathBuf>,
}

fn default_threshold() -> i64 {
    DEFAULT_ALERT_THRESHOLD_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            alert_threshold_days: DEFAULT_ALERT_THRESHOLD_DAYS,
            follow_symlinks: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| BackstopError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)
            .map_err(|e| BackstopError::Config(format!("Failed to parse config TOML: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alert_threshold_days < 0 {
            return Err(BackstopError::Config(format!(
                "alert_threshold_days must not be negative, got {}",
                self.alert_threshold_days
            )));
        }
        Ok(())
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub settings: Settings,
}

impl Config {
    /// Database path: override, then `BACKSTOP_DB`, then the XDG data dir.
    /// Settings: override file, then the XDG config file if it exists.
    pub fn new(db_override: Option<PathBuf>, config_override: Option<PathBuf>) -> Result<Self> {
        let db_path = if let Some(path) = db_override {
            path
        } else if let Ok(env_path) = std::env::var(DB_ENV_VAR) {
            PathBuf::from(env_path)
        } else {
            let xdg = BaseDirectories::with_prefix(APP_NAME)
                .map_err(|e| BackstopError::Config(format!("Failed to initialize XDG directories: {}", e)))?;
            xdg.place_data_file("backstop.db")
                .map_err(|e| BackstopError::Config(format!("Failed to create data directory: {}", e)))?
        };

        let config_path = config_override.or_else(|| {
            BaseDirectories::with_prefix(APP_NAME)
                .ok()
                .and_then(|xdg| xdg.find_config_file("backstop.toml"))
        });

        let settings = match &config_path {
            Some(path) => {
                log::debug!("Loading settings from {}", path.display());
                Settings::load_from_file(path)?
            }
            None => Settings::default(),
        };

        let log_path = settings.log_file.clone().or_else(|| {
            BaseDirectories::with_prefix(APP_NAME)
                .ok()
                .and_then(|xdg| xdg.place_state_file("backstop.log").ok())
        });

        Ok(Self {
            db_path,
            config_path,
            log_path,
            settings,
        })
    }

    pub fn ensure_db_directory(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Command-line paths win over the settings file.
    pub fn resolve_paths(
        &self,
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
    ) -> Result<(PathBuf, PathBuf)> {
        let source = source
            .or_else(|| self.settings.source.clone())
            .ok_or_else(|| BackstopError::Config("No source directory given".to_string()))?;
        let destination = destination
            .or_else(|| self.settings.destination.clone())
            .ok_or_else(|| BackstopError::Config("No destination directory given".to_string()))?;
        Ok((source, destination))
    }

    pub fn threshold_days(&self, override_days: Option<i64>) -> i64 {
        override_days.unwrap_or(self.settings.alert_threshold_days)
    }
}
