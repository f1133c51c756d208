//! `mboard config`: registry roster / matching config.

use std::path::PathBuf;

use clap::Subcommand;

use marketboard_config::Settings;

use crate::context::{load_registry_config, Context, GlobalArgs};
use crate::CliError;

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Validate a registry config without touching stored state
    #[command(after_help = "\
Examples:
  mboard config validate tbilisi-hotels.registry.toml")]
    Validate {
        /// Path to the .registry.toml file
        path: PathBuf,
    },

    /// Print the settings file and the registry config in effect
    Path,
}

pub fn cmd_config(global: &GlobalArgs, cmd: RegistryCommands) -> Result<(), CliError> {
    match cmd {
        RegistryCommands::Validate { path } => cmd_config_validate(path),
        RegistryCommands::Path => cmd_config_path(global),
    }
}

fn cmd_config_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_registry_config(&path)?;
    println!(
        "valid: registry '{}' with {} entities ({} stop words, history {} / {}h)",
        config.name,
        config.roster.len(),
        config.matching.stop_words.len(),
        config.history.capacity,
        config.history.min_interval_hours
    );
    Ok(())
}

fn cmd_config_path(global: &GlobalArgs) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let settings = global
        .settings
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(Settings::config_path_display);
    println!("settings:  {settings}");
    match &ctx.config_path {
        Some(path) => println!("registry:  {}", path.display()),
        None => println!("registry:  built-in ({})", ctx.config.name),
    }
    println!("data dir:  {}", ctx.data_dir.display());
    Ok(())
}
