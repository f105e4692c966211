//! Persisted application settings
//!
//! Stored as JSON at `<config dir>/xorriso-burner/settings.json`.
//! Missing fields take their default, so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{BurnOptions, IsoOptions};
use crate::xorriso::find_in_path;

const APP_DIR: &str = "xorriso-burner";
const SETTINGS_FILE: &str = "settings.json";

/// Application-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// xorriso binary, absolute or looked up on PATH
    pub xorriso_path: PathBuf,
    pub default_burn: BurnOptions,
    pub default_iso: IsoOptions,
    /// Upper bound for media and TOC queries
    pub query_timeout_secs: u64,
    /// Upper bound for drive profile queries
    pub profile_timeout_secs: u64,
    /// Upper bound for standalone blank and format runs
    pub media_timeout_secs: u64,
    pub device_poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            xorriso_path: find_in_path("xorriso").unwrap_or_else(|| PathBuf::from("xorriso")),
            default_burn: BurnOptions::default(),
            default_iso: IsoOptions::default(),
            query_timeout_secs: 15,
            profile_timeout_secs: 10,
            media_timeout_secs: 30 * 60,
            device_poll_interval_secs: 5,
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }

    pub fn device_poll_interval(&self) -> Duration {
        Duration::from_secs(self.device_poll_interval_secs.max(1))
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            log::debug!("Using default settings: could not determine config directory");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                log::debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                log::debug!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Err("Settings file not found".to_string());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse settings: {}", e))
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        let path =
            Self::default_path().ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        log::debug!("Saved settings to {:?}", path);
        Ok(())
    }
}
