//! Configuration management for RoadCrew

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::resolver::DuplicateRule;

/// Application configuration.
///
/// Loaded once at process start and treated as immutable for the process
/// lifetime; everything that varies per deployment lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth bearer token for the storage backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_token: Option<String>,

    /// Drive folder id everything is filed under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_folder_id: Option<String>,

    /// Organization time zone used to render the daily folder name
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Upload policy knobs
    #[serde(default)]
    pub uploads: UploadPreferences,
}

/// Upload session policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPreferences {
    /// Minimum eligible attachments before a session is triggered
    #[serde(default = "default_min_photos")]
    pub min_photos: usize,

    /// Accepted attachment content types
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,

    /// Scratch directory for in-flight downloads; defaults to the system
    /// temp dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Hours between full folder-cache sweeps
    #[serde(default = "default_sweep_hours")]
    pub cache_sweep_hours: u64,

    /// Which folder wins when Drive holds duplicates of the same name
    #[serde(default)]
    pub duplicate_rule: DuplicateRule,
}

fn default_time_zone() -> String {
    "America/New_York".to_string()
}

fn default_min_photos() -> usize {
    4
}

fn default_accepted_types() -> Vec<String> {
    vec!["image/jpeg".to_string(), "image/png".to_string()]
}

fn default_sweep_hours() -> u64 {
    6
}

impl Default for UploadPreferences {
    fn default() -> Self {
        Self {
            min_photos: default_min_photos(),
            accepted_types: default_accepted_types(),
            scratch_dir: None,
            cache_sweep_hours: default_sweep_hours(),
            duplicate_rule: DuplicateRule::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_token: None,
            root_folder_id: None,
            time_zone: default_time_zone(),
            uploads: UploadPreferences::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".roadcrew").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Token lives in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Parse the configured organization time zone
    pub fn org_time_zone(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimeZone(self.time_zone.clone()).into())
    }

    /// Resolved scratch directory for in-flight downloads
    pub fn scratch_dir(&self) -> PathBuf {
        self.uploads
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("roadcrew"))
    }

    /// Validate that storage-facing configuration is present
    pub fn validate_storage(&self) -> Result<()> {
        if self.storage_token.is_none() {
            return Err(ConfigError::MissingToken.into());
        }
        if self.root_folder_id.is_none() {
            return Err(ConfigError::MissingRootFolder.into());
        }
        Ok(())
    }
}
