// Application settings
// Loaded from ~/.config/marketboard/settings.json

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::store::FileStore;

pub const DEFAULT_LOCATE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Storage
    #[serde(rename = "data.dir")]
    pub data_dir: Option<PathBuf>,

    // Registry roster / matching config (TOML). None = compiled-in roster.
    #[serde(rename = "registry.config")]
    pub registry_config: Option<PathBuf>,

    // Lookup feed written by the external fetcher
    #[serde(rename = "source.feed")]
    pub source_feed: Option<PathBuf>,

    // Location hint sent with each lookup
    #[serde(rename = "location.latitude")]
    pub latitude: Option<f64>,

    #[serde(rename = "location.longitude")]
    pub longitude: Option<f64>,

    #[serde(rename = "location.timeoutMs")]
    pub locate_timeout_ms: u64,

    // Base URL that shared report links point at
    #[serde(rename = "share.baseUrl")]
    pub share_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            registry_config: None,
            source_feed: None,
            latitude: None,
            longitude: None,
            locate_timeout_ms: DEFAULT_LOCATE_TIMEOUT_MS,
            share_base_url: String::new(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marketboard");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file is created with commented
    /// defaults; an unreadable one is reported and ignored.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("error parsing {}: {e}; using default settings", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory holding persisted state, explicit or per-user default
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    /// Configured coordinates, only when both halves are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn locate_timeout(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }

    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("error creating config directory: {e}");
                return;
            }
        }

        let default_config = r#"{
    // Where the registry and theme are persisted (default: per-user data dir)
    "data.dir": null,

    // Roster / matching config (TOML). null = built-in Batumi roster
    "registry.config": null,

    // JSON feed produced by the lookup service
    "source.feed": null,

    // Optional coordinates passed along with each lookup
    "location.latitude": null,
    "location.longitude": null,
    "location.timeoutMs": 5000,

    // Base URL for shared report links (#rpt=...)
    "share.baseUrl": ""
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            warn!("error writing default {}: {e}", path.display());
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
