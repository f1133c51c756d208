//! `mboard share | decode | theme`

use chrono::{FixedOffset, Local};
use tracing::debug;

use marketboard_config::{load_theme, save_theme, toggle_theme};
use marketboard_core::Theme;
use marketboard_protocol::{decode, encode, parse_fragment, snapshot_link};

use crate::context::{Context, GlobalArgs};
use crate::{print_json, render, CliError};

pub enum ThemeChange {
    Set(Theme),
    Toggle,
}

pub fn cmd_share(global: &GlobalArgs, base_url: Option<String>) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let engine = ctx.open_engine()?;
    let theme = load_theme(engine.store()).map_err(CliError::storage)?;

    let encoded = encode(engine.state(), theme)
        .map_err(|e| CliError::general(format!("cannot encode report: {e}")))?;
    let base = base_url.unwrap_or_else(|| ctx.settings.share_base_url.clone());
    debug!(entities = engine.state().registry.len(), bytes = encoded.len(), "report encoded");

    println!("{}", snapshot_link(&base, &encoded));
    Ok(())
}

/// Payload part of whatever the user pasted: a link, a fragment, or the
/// bare base64 text.
fn payload_of(link: &str) -> &str {
    let link = link.trim();
    parse_fragment(link).unwrap_or(link)
}

pub fn cmd_decode(link: &str, json: bool) -> Result<(), CliError> {
    let payload = decode(payload_of(link)).map_err(CliError::decode)?;

    if json {
        return print_json(&payload);
    }

    let offset: FixedOffset = *Local::now().offset();
    println!("updated: {}", render::timestamp(payload.last_updated, offset));
    if let Some(theme) = payload.theme {
        println!("theme:   {theme}");
    }
    let state = payload.into_aggregate();
    println!();
    print!("{}", render::table(state.registry.records(), None));
    Ok(())
}

pub fn cmd_theme(global: &GlobalArgs, change: Option<ThemeChange>) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let mut store = ctx.store();

    let theme = match change {
        None => load_theme(&store),
        Some(ThemeChange::Set(theme)) => save_theme(&mut store, theme).map(|()| theme),
        Some(ThemeChange::Toggle) => toggle_theme(&mut store),
    }
    .map_err(CliError::storage)?;

    println!("{theme}");
    Ok(())
}
