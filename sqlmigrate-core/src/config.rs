//! Configuration management
//!
//! Settings live in `<config dir>/settings.json`:
//! ```json
//! {
//!   "databasePath": "app.duckdb",
//!   "scriptsDir": "migrations",
//!   "dialect": "postgres",
//!   "timeoutSecs": 600
//! }
//! ```
//! Every field is optional. Relative paths resolve against the config
//! directory, and `SQLMIGRATE_*` environment variables override the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::Dialect;

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scripts_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dialect: Option<Dialect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    // Keys this tool doesn't manage, kept on save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved migration runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
    pub scripts_dir: PathBuf,
    pub dialect: Dialect,
    pub timeout: Option<Duration>,
    _raw_settings: SettingsFile,
}

impl Config {
    /// Config directory from `SQLMIGRATE_DIR`, else `~/.sqlmigrate`
    pub fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("SQLMIGRATE_DIR") {
            return Ok(PathBuf::from(dir));
        }
        dirs::home_dir()
            .map(|home| home.join(".sqlmigrate"))
            .ok_or_else(|| Error::config("could not find home directory"))
    }

    /// Load config from a directory, applying environment overrides
    pub fn load(config_dir: &Path) -> Result<Self> {
        Self::load_with_env(config_dir, |key| std::env::var(key).ok())
    }

    /// Load config with an explicit environment lookup
    pub fn load_with_env(config_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = config_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)?
        } else {
            SettingsFile::default()
        };

        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                config_dir.join(path)
            }
        };

        let database_path = env("SQLMIGRATE_DATABASE")
            .map(PathBuf::from)
            .or_else(|| raw.database_path.clone())
            .map(|p| resolve(&p))
            .unwrap_or_else(|| config_dir.join("sqlmigrate.duckdb"));

        let scripts_dir = env("SQLMIGRATE_SCRIPTS")
            .map(PathBuf::from)
            .or_else(|| raw.scripts_dir.clone())
            .map(|p| resolve(&p))
            .unwrap_or_else(|| config_dir.join("migrations"));

        let dialect = match env("SQLMIGRATE_DIALECT") {
            Some(value) => value.parse()?,
            None => raw.dialect.unwrap_or_default(),
        };

        let timeout_secs = match env("SQLMIGRATE_TIMEOUT_SECS") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                Error::config(format!("SQLMIGRATE_TIMEOUT_SECS is not a number: {}", value))
            })?),
            None => raw.timeout_secs,
        };

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            database_path,
            scripts_dir,
            dialect,
            timeout: timeout_secs.map(Duration::from_secs),
            _raw_settings: raw,
        })
    }

    /// Save config to its directory
    /// Preserves other settings that this tool doesn't manage
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;

        let mut settings = self._raw_settings.clone();
        settings.database_path = Some(self.database_path.clone());
        settings.scripts_dir = Some(self.scripts_dir.clone());
        settings.dialect = Some(self.dialect);
        settings.timeout_secs = self.timeout.map(|t| t.as_secs());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(self.config_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }
}
