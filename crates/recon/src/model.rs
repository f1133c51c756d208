use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::RecordReason;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One result row from the lookup collaborator.
///
/// Only `name` is guaranteed. Aliases accept the field names the dashboard's
/// lookup service emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRecord {
    pub name: String,
    #[serde(default, alias = "placeId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "userRatingsTotal")]
    pub rating_count: u64,
    #[serde(default, alias = "vicinity", skip_serializing_if = "Option::is_none")]
    pub location_label: Option<String>,
    #[serde(default, alias = "googleMapsUri", skip_serializing_if = "Option::is_none")]
    pub map_link: Option<String>,
}

impl LiveRecord {
    pub fn named(name: impl Into<String>, rating: f64, rating_count: u64) -> Self {
        Self {
            name: name.into(),
            external_id: None,
            rating,
            rating_count,
            location_label: None,
            map_link: None,
        }
    }

    pub fn with_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_location(mut self, label: impl Into<String>) -> Self {
        self.location_label = Some(label.into());
        self
    }

    pub fn with_map_link(mut self, link: impl Into<String>) -> Self {
        self.map_link = Some(link.into());
        self
    }

    /// External id, treating an empty string as absent.
    pub fn id(&self) -> Option<&str> {
        self.external_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// What happened to the live records of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Matched and carried observations; target overwritten.
    pub applied: usize,
    /// Matched but carried zero observations; target untouched.
    pub ignored_empty: usize,
    /// Resolved to no roster entity; discarded.
    pub unmatched: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.applied + self.ignored_empty + self.unmatched
    }
}

/// Summary of one applied reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub merge: MergeReport,
    /// Why a snapshot was appended, if one was.
    pub recorded: Option<RecordReason>,
    pub history_len: usize,
    pub last_updated: DateTime<Utc>,
}
