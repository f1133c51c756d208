//! `mboard refresh | show | history | status | roster`

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use marketboard_config::load_theme;
use marketboard_core::{AggregateState, EntityRecord, Theme};
use marketboard_protocol::{decode, parse_fragment};
use marketboard_recon::projector::{self, MarketSummary, SortDirection, SortKey, SortState};
use marketboard_recon::schedule::needs_daily_refresh;
use marketboard_recon::source::{acquire_location, FixedLocation, JsonFeedSource};
use marketboard_recon::{Coordinates, CycleOutcome, CycleReport, Origin};

use crate::context::{Context, GlobalArgs};
use crate::{print_json, render, CliError};

// ============================================================================
// refresh
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshOutput<'a> {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a CycleReport>,
    last_updated: Option<chrono::DateTime<Utc>>,
}

pub fn cmd_refresh(
    global: &GlobalArgs,
    feed: Option<PathBuf>,
    coordinates: Option<(f64, f64)>,
    if_due: bool,
    json: bool,
) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let feed = feed.or_else(|| ctx.settings.source_feed.clone()).ok_or_else(|| {
        CliError::usage("no lookup feed given")
            .with_hint("pass --feed <PATH> or set \"source.feed\" in settings")
    })?;

    let mut engine = ctx.open_engine()?;
    let now = Utc::now();

    if if_due {
        let last = engine.state().last_updated;
        let hour = ctx.config.schedule.daily_refresh_hour;
        if !needs_daily_refresh(last, now, hour, ctx.offset) {
            info!(hour, "refresh not due");
            if json {
                return print_json(&RefreshOutput { outcome: "skipped", report: None, last_updated: last });
            }
            println!("skipped: already refreshed after {hour:02}:00 today");
            return Ok(());
        }
    }

    let coordinates = match coordinates {
        Some((latitude, longitude)) => Some(Coordinates { latitude, longitude }),
        None => {
            let configured = ctx
                .settings
                .coordinates()
                .map(|(latitude, longitude)| Coordinates { latitude, longitude });
            acquire_location(Arc::new(FixedLocation(configured)), ctx.settings.locate_timeout())
        }
    };

    let source = JsonFeedSource::new(feed);
    let report = match engine.refresh(&source, coordinates, now).map_err(CliError::engine)? {
        CycleOutcome::Applied(report) => report,
        CycleOutcome::Stale { token, current } => {
            return Err(CliError::general(format!(
                "cycle {} was superseded by cycle {}",
                token.value(),
                current.value()
            )));
        }
    };

    if json {
        return print_json(&RefreshOutput {
            outcome: "applied",
            report: Some(&report),
            last_updated: Some(report.last_updated),
        });
    }

    let m = report.merge;
    println!(
        "refreshed: {} applied, {} without ratings, {} unmatched",
        m.applied, m.ignored_empty, m.unmatched
    );
    match report.recorded {
        Some(reason) => println!("history: snapshot recorded ({reason:?}), {} kept", report.history_len),
        None => println!("history: unchanged, {} kept", report.history_len),
    }
    Ok(())
}

// ============================================================================
// show
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput<'a> {
    source: &'static str,
    last_updated: Option<chrono::DateTime<Utc>>,
    sort: SortState,
    subject_id: Option<&'a str>,
    summary: &'a MarketSummary,
    theme: Theme,
    rows: &'a [EntityRecord],
}

fn parse_sort(sort: Option<&str>, asc: bool) -> Result<SortState, CliError> {
    let key = match sort {
        Some(raw) => raw
            .parse::<SortKey>()
            .map_err(|e| CliError::usage(e).with_hint("valid keys: name, rating, ratingCount, locationLabel, externalId, mapLink"))?,
        None => SortState::default().key,
    };
    let direction = if asc { SortDirection::Ascending } else { SortDirection::Descending };
    Ok(SortState::new(key, direction))
}

/// Decoded report, or `None` (with a warning) when the link is unusable.
fn load_report(link: &str) -> Option<(AggregateState, Option<Theme>)> {
    let encoded = parse_fragment(link).unwrap_or(link);
    match decode(encoded) {
        Ok(payload) => {
            let theme = payload.theme;
            Some((payload.into_aggregate(), theme))
        }
        Err(e) => {
            warn!("shared report unreadable, showing local registry: {e}");
            None
        }
    }
}

pub fn cmd_show(
    global: &GlobalArgs,
    search: &str,
    sort: Option<&str>,
    asc: bool,
    report: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let sort = parse_sort(sort, asc)?;
    let ctx = Context::load(global)?;
    let local_theme = load_theme(&ctx.store()).map_err(CliError::storage)?;

    let (state, theme, origin) = match report.and_then(load_report) {
        Some((state, theme)) => (state, theme.unwrap_or(local_theme), Origin::Snapshot),
        None => {
            let engine = ctx.open_engine()?;
            (engine.state().clone(), local_theme, Origin::Local)
        }
    };

    let rows = projector::project(&state.registry, search, Some(sort));
    let subject = projector::subject_id(&state.registry, &ctx.config.subject_key);
    let summary = projector::summarize(&state.registry, &ctx.config.subject_key);
    let source = match origin {
        Origin::Local => "local",
        Origin::Snapshot => "snapshot",
    };

    if json {
        return print_json(&ShowOutput {
            source,
            last_updated: state.last_updated,
            sort,
            subject_id: subject,
            summary: &summary,
            theme,
            rows: &rows,
        });
    }

    if origin == Origin::Snapshot {
        println!("shared report (read-only)");
    }
    println!("updated: {}", render::timestamp(state.last_updated, ctx.offset));
    println!();
    print!("{}", render::table(&rows, subject));
    if rows.is_empty() {
        println!("  (no venues match \"{search}\")");
    }
    println!();
    println!("{}", render::summary_line(&summary));
    Ok(())
}

// ============================================================================
// history
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRow {
    timestamp: chrono::DateTime<Utc>,
    total_ratings: u64,
    delta: Option<i64>,
    counts: Vec<u64>,
}

/// `current - previous`, clamped to the `i64` range.
fn count_delta(previous: u64, current: u64) -> i64 {
    let diff = i128::from(current) - i128::from(previous);
    i64::try_from(diff).unwrap_or(if diff > 0 { i64::MAX } else { i64::MIN })
}

pub fn cmd_history(global: &GlobalArgs, limit: Option<usize>, json: bool) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let engine = ctx.open_engine()?;
    let history = &engine.state().history;

    let mut previous: Option<u64> = None;
    let mut rows: Vec<HistoryRow> = history
        .iter()
        .map(|snapshot| {
            let counts = snapshot.rating_counts();
            let total = counts.iter().copied().fold(0u64, u64::saturating_add);
            let delta = previous.map(|p| count_delta(p, total));
            previous = Some(total);
            HistoryRow { timestamp: snapshot.timestamp, total_ratings: total, delta, counts }
        })
        .collect();
    if let Some(n) = limit {
        rows = rows.split_off(rows.len().saturating_sub(n));
    }

    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("no history recorded yet");
        return Ok(());
    }
    println!("{:<22}  {:>10}  {:>8}", "WHEN", "RATINGS", "CHANGE");
    for row in &rows {
        let change = match row.delta {
            Some(d) if d > 0 => format!("+{}", render::thousands(d as u64)),
            Some(d) if d < 0 => format!("-{}", render::thousands(d.unsigned_abs())),
            Some(_) => "0".to_string(),
            None => String::new(),
        };
        println!(
            "{:<22}  {:>10}  {:>8}",
            render::timestamp(Some(row.timestamp), ctx.offset),
            render::thousands(row.total_ratings),
            change
        );
    }
    Ok(())
}

// ============================================================================
// status
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    data_dir: String,
    config: Option<String>,
    registry: String,
    entities: usize,
    observed: usize,
    last_updated: Option<chrono::DateTime<Utc>>,
    history_len: usize,
    history_capacity: usize,
    refresh_due: bool,
    theme: Theme,
}

pub fn cmd_status(global: &GlobalArgs, json: bool) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    let engine = ctx.open_engine()?;
    let state = engine.state();
    let theme = load_theme(engine.store()).map_err(CliError::storage)?;

    let status = StatusOutput {
        data_dir: ctx.data_dir.display().to_string(),
        config: ctx.config_path.as_ref().map(|p| p.display().to_string()),
        registry: ctx.config.name.clone(),
        entities: state.registry.len(),
        observed: state.registry.iter().filter(|r| !r.is_placeholder()).count(),
        last_updated: state.last_updated,
        history_len: state.history.len(),
        history_capacity: engine.policy().capacity,
        refresh_due: needs_daily_refresh(
            state.last_updated,
            Utc::now(),
            ctx.config.schedule.daily_refresh_hour,
            ctx.offset,
        ),
        theme,
    };

    if json {
        return print_json(&status);
    }

    println!("registry:  {} ({} of {} observed)", status.registry, status.observed, status.entities);
    println!("config:    {}", status.config.as_deref().unwrap_or("built-in"));
    println!("data dir:  {}", status.data_dir);
    println!("updated:   {}", render::timestamp(status.last_updated, ctx.offset));
    println!("history:   {} / {}", status.history_len, status.history_capacity);
    println!("due:       {}", if status.refresh_due { "yes" } else { "no" });
    println!("theme:     {}", status.theme);
    Ok(())
}

// ============================================================================
// roster
// ============================================================================

pub fn cmd_roster(global: &GlobalArgs, json: bool) -> Result<(), CliError> {
    let ctx = Context::load(global)?;
    if json {
        return print_json(&ctx.config.roster);
    }
    for entity in &ctx.config.roster {
        println!("{:<28}  {}", entity.external_id, entity.name);
    }
    Ok(())
}
