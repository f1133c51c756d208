//! Everything a command needs before it can touch the registry: settings,
//! the registry config, the store and the calendar offset.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local};
use clap::Args;
use tracing::debug;

use marketboard_config::{FileStore, Settings};
use marketboard_recon::{Engine, HistoryPolicy, RegistryConfig};

use crate::CliError;

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding persisted state (overrides settings "data.dir")
    #[arg(long, global = true, env = "MBOARD_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Registry TOML with roster and matching rules (overrides settings "registry.config")
    #[arg(long, global = true, env = "MBOARD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Settings file (default: ~/.config/marketboard/settings.json)
    #[arg(long, global = true, env = "MBOARD_SETTINGS", value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

pub struct Context {
    pub settings: Settings,
    pub data_dir: PathBuf,
    pub config: RegistryConfig,
    pub config_path: Option<PathBuf>,
    /// Offset defining calendar days and the daily refresh hour.
    pub offset: FixedOffset,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self, CliError> {
        let settings = match &global.settings {
            Some(path) => Settings::load_from(path),
            None => Settings::load(),
        };

        let config_path = global.config.clone().or_else(|| settings.registry_config.clone());
        let config = match &config_path {
            Some(path) => load_registry_config(path)?,
            None => RegistryConfig::default(),
        };

        let data_dir = global.data_dir.clone().unwrap_or_else(|| settings.data_dir());
        let offset = config.effective_offset(*Local::now().offset());
        debug!(
            data_dir = %data_dir.display(),
            roster = config.roster.len(),
            offset = %offset,
            "context loaded"
        );

        Ok(Self {
            settings,
            data_dir,
            config,
            config_path,
            offset,
        })
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.data_dir)
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.config.history_policy(self.offset)
    }

    pub fn open_engine(&self) -> Result<Engine<FileStore>, CliError> {
        Engine::open(self.config.clone(), self.policy(), self.store()).map_err(CliError::engine)
    }
}

pub fn load_registry_config(path: &Path) -> Result<RegistryConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {e}", path.display())))?;
    RegistryConfig::from_toml(&text)
        .map_err(|e| CliError::config(e).with_hint(format!("in {}", path.display())))
}
