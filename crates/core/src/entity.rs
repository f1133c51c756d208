use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Location label carried by a record that has never seen live data.
pub const PLACEHOLDER_LOCATION: &str = "Searching Market...";

const MAP_SEARCH_BASE: &str = "https://www.google.com/maps/search/";

/// Characters left unescaped by `encodeURIComponent`.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Deterministic map search link for an entity name.
pub fn map_link(name: &str) -> String {
    format!("{MAP_SEARCH_BASE}{}", utf8_percent_encode(name, URI_COMPONENT))
}

/// A tracked entity, fixed at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntity {
    pub name: String,
    pub external_id: String,
}

impl RosterEntity {
    pub fn new(name: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_id: external_id.into(),
        }
    }
}

/// One registry row. `id` always equals `external_id`.
///
/// Aliases accept the field names written by older dashboard builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: String,
    #[serde(alias = "placeId")]
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "userRatingsTotal")]
    pub rating_count: u64,
    #[serde(default, alias = "vicinity")]
    pub location_label: String,
    #[serde(default, alias = "googleMapsUri")]
    pub map_link: String,
}

impl EntityRecord {
    /// Record for a roster entity that has not been observed yet.
    pub fn placeholder(entity: &RosterEntity) -> Self {
        Self {
            id: entity.external_id.clone(),
            external_id: entity.external_id.clone(),
            name: entity.name.clone(),
            rating: 0.0,
            rating_count: 0,
            location_label: PLACEHOLDER_LOCATION.to_string(),
            map_link: map_link(&entity.name),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.rating_count == 0
    }
}
