//! Collaborator seams: the lookup source and the location provider.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use marketboard_core::RosterEntity;

use crate::error::SourceError;
use crate::model::LiveRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything the lookup collaborator is told about a cycle.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub location_hint: &'a str,
    pub coordinates: Option<Coordinates>,
    pub roster: &'a [RosterEntity],
}

/// The external lookup. Any error aborts the whole cycle; partial results
/// are not distinguished from failure.
pub trait DataSource {
    fn query(&self, request: &QueryRequest<'_>) -> Result<Vec<LiveRecord>, SourceError>;
}

// ---------------------------------------------------------------------------
// JSON feed
// ---------------------------------------------------------------------------

/// Reads lookup results that some external process wrote to disk.
#[derive(Debug, Clone)]
pub struct JsonFeedSource {
    path: PathBuf,
}

impl JsonFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonFeedSource {
    fn query(&self, request: &QueryRequest<'_>) -> Result<Vec<LiveRecord>, SourceError> {
        debug!(
            "reading feed {} for '{}' ({} roster entities)",
            self.path.display(),
            request.location_hint,
            request.roster.len()
        );
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            SourceError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        parse_feed(&text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Bare(Vec<LiveRecord>),
    Wrapped {
        #[serde(alias = "casinos", alias = "results")]
        records: Vec<LiveRecord>,
    },
}

/// Accepts a bare JSON array of records or an object with a `records`
/// (alias `casinos`, `results`) array.
pub fn parse_feed(text: &str) -> Result<Vec<LiveRecord>, SourceError> {
    let doc: FeedDocument =
        serde_json::from_str(text).map_err(|e| SourceError::Malformed(e.to_string()))?;
    Ok(match doc {
        FeedDocument::Bare(records) => records,
        FeedDocument::Wrapped { records } => records,
    })
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

pub trait LocationProvider: Send + Sync {
    fn locate(&self) -> Result<Coordinates, String>;
}

/// Coordinates known up front (settings or flags). `None` behaves like a
/// denied permission prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

impl LocationProvider for FixedLocation {
    fn locate(&self) -> Result<Coordinates, String> {
        self.0.ok_or_else(|| "no location configured".to_string())
    }
}

/// Best-effort location with a hard deadline.
///
/// The provider runs on a helper thread; denial, panic or timeout all yield
/// `None`. A provider still running at the deadline is left to finish on its
/// own and its answer is dropped.
pub fn acquire_location(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Option<Coordinates> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("locate".into())
        .spawn(move || {
            let _ = tx.send(provider.locate());
        });
    if let Err(e) = spawned {
        debug!("location thread failed to start: {e}");
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(coords)) => Some(coords),
        Ok(Err(reason)) => {
            debug!("location unavailable: {reason}");
            None
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            debug!("location timed out after {}ms", timeout.as_millis());
            None
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            debug!("location provider exited without an answer");
            None
        }
    }
}
