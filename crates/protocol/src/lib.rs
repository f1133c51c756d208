//! Marketboard Portable Report Format
//!
//! A shared report is the registry squeezed into a URL fragment:
//!
//! ```text
//! {"c":[{"n":name,"r":rating,"v":ratingCount,"p":externalId},...],"u":lastUpdated,"t":theme}
//!   -> JSON -> encodeURIComponent-style percent-encoding -> base64 (standard, padded)
//!   -> https://host/path#rpt=<encoded>
//! ```
//!
//! Reports are lossy: no history, no location labels, no map links. Links
//! using the older `#report=` prefix and entity objects using the long field
//! names (`name`, `rating`, `userRatingsTotal`, `placeId`, `id`) are still
//! accepted; [`WireEntity::migrate`] folds every known schema into the
//! current [`PortableEntity`].
//!
//! # Usage
//!
//! ```ignore
//! use marketboard_protocol::{decode, encode, parse_fragment, snapshot_link};
//!
//! let link = snapshot_link("https://board.example/", &encode(&state, theme)?);
//! let payload = decode(parse_fragment(&link).unwrap())?;
//! let state = payload.into_aggregate();
//! ```

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use marketboard_core::entity::URI_COMPONENT;
use marketboard_core::{map_link, AggregateState, EntityRecord, Registry, Theme};

/// Fragment prefix written by [`snapshot_link`].
pub const FRAGMENT_PREFIX: &str = "#rpt=";

/// Fragment prefix of links shared by older builds. Read-only.
pub const LEGACY_FRAGMENT_PREFIX: &str = "#report=";

/// Location label given to every record rebuilt from a report.
pub const SNAPSHOT_LOCATION: &str = "Snapshot Location";

/// Accepts padded and unpadded input; browsers' `atob` does too.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not base64.
    #[error("report is not valid base64: {0}")]
    Transport(#[from] base64::DecodeError),
    /// Decoded bytes are not percent-encoded UTF-8.
    #[error("report text is not valid UTF-8: {0}")]
    Text(String),
    /// Text is not a report object.
    #[error("report is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Current model
// =============================================================================

/// One entity as carried by a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableEntity {
    pub name: String,
    pub rating: f64,
    pub rating_count: u64,
    pub external_id: String,
    /// Only present in legacy reports that carried an `address`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_label: Option<String>,
}

/// A decoded report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortableReportPayload {
    pub entities: Vec<PortableEntity>,
    pub last_updated: Option<DateTime<Utc>>,
    pub theme: Option<Theme>,
}

impl PortableReportPayload {
    /// Rebuild an aggregate for display. Map links are regenerated from the
    /// names; history is empty. A repeated external id keeps its first entry.
    pub fn into_aggregate(self) -> AggregateState {
        let records = self.entities.into_iter().map(|e| EntityRecord {
            id: e.external_id.clone(),
            map_link: map_link(&e.name),
            external_id: e.external_id,
            name: e.name,
            rating: e.rating,
            rating_count: e.rating_count,
            location_label: e.location_label.unwrap_or_else(|| SNAPSHOT_LOCATION.to_string()),
        });
        AggregateState {
            registry: Registry::from_records(records),
            last_updated: self.last_updated,
            history: Vec::new(),
        }
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// Field naming used by an entity object on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySchema {
    /// `name` / `rating` / `userRatingsTotal` / `placeId` / `id`.
    Legacy,
    /// `n` / `r` / `v` / `p`.
    Compact,
}

impl EntitySchema {
    pub fn version(self) -> u32 {
        match self {
            Self::Legacy => 0,
            Self::Compact => 1,
        }
    }
}

/// Entity object as found on the wire, under any known schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEntity {
    n: Option<String>,
    r: Option<f64>,
    v: Option<u64>,
    p: Option<String>,
    name: Option<String>,
    rating: Option<f64>,
    #[serde(rename = "userRatingsTotal")]
    user_ratings_total: Option<u64>,
    #[serde(rename = "placeId")]
    place_id: Option<String>,
    id: Option<String>,
    address: Option<String>,
}

impl WireEntity {
    pub fn schema(&self) -> EntitySchema {
        if self.n.is_some() || self.r.is_some() || self.v.is_some() || self.p.is_some() {
            EntitySchema::Compact
        } else {
            EntitySchema::Legacy
        }
    }

    /// Map to the current model. Compact fields win over long ones.
    ///
    /// Id: `p`, `placeId`, `id`, else a fresh random id. Name: `n`, `name`,
    /// else the id. A zero `r` / `v` counts as missing and falls back to
    /// `rating` / `userRatingsTotal`; both absent reads as zero.
    pub fn migrate(self) -> PortableEntity {
        let external_id = non_empty(self.p)
            .or_else(|| non_empty(self.place_id))
            .or_else(|| non_empty(self.id))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = non_empty(self.n)
            .or_else(|| non_empty(self.name))
            .unwrap_or_else(|| external_id.clone());
        PortableEntity {
            name,
            rating: self.r.filter(|r| *r != 0.0).or(self.rating).unwrap_or(0.0),
            rating_count: self.v.filter(|v| *v != 0).or(self.user_ratings_total).unwrap_or(0),
            external_id,
            location_label: non_empty(self.address),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct WireEnvelope {
    /// `null` and absent both mean no entities.
    #[serde(default)]
    c: Option<Vec<WireEntity>>,
    #[serde(default)]
    u: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Serialize)]
struct CompactEntity<'a> {
    n: &'a str,
    r: f64,
    v: u64,
    p: &'a str,
}

#[derive(Serialize)]
struct CompactEnvelope<'a> {
    c: Vec<CompactEntity<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    u: Option<String>,
    t: Theme,
}

// =============================================================================
// Codec
// =============================================================================

/// Encode the registry (not the history) and the display preference.
pub fn encode(state: &AggregateState, theme: Theme) -> Result<String, serde_json::Error> {
    let envelope = CompactEnvelope {
        c: state
            .registry
            .iter()
            .map(|e| CompactEntity {
                n: &e.name,
                r: e.rating,
                v: e.rating_count,
                p: &e.external_id,
            })
            .collect(),
        // Millisecond `Z` form, as browsers print it.
        u: state
            .last_updated
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        t: theme,
    };
    let json = serde_json::to_string(&envelope)?;
    let escaped = utf8_percent_encode(&json, URI_COMPONENT).to_string();
    Ok(base64::engine::general_purpose::STANDARD.encode(escaped))
}

pub fn decode(encoded: &str) -> Result<PortableReportPayload, DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT_BASE64.decode(compact)?;
    let escaped = String::from_utf8(bytes).map_err(|e| DecodeError::Text(e.to_string()))?;
    let json: Cow<'_, str> = percent_decode_str(&escaped)
        .decode_utf8()
        .map_err(|e| DecodeError::Text(e.to_string()))?;
    let envelope: WireEnvelope = serde_json::from_str(&json)?;

    let last_updated = envelope.u.or(envelope.updated).and_then(|raw| {
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                warn!("ignoring report timestamp {raw:?}: {e}");
                None
            }
        }
    });
    let theme = envelope.t.and_then(|raw| match raw.parse::<Theme>() {
        Ok(theme) => Some(theme),
        Err(e) => {
            warn!("ignoring report theme: {e}");
            None
        }
    });

    Ok(PortableReportPayload {
        entities: envelope.c.unwrap_or_default().into_iter().map(WireEntity::migrate).collect(),
        last_updated,
        theme,
    })
}

// =============================================================================
// Transport
// =============================================================================

/// Encoded report inside a URL or bare fragment, under either prefix.
/// Everything after the prefix is taken, as browsers hand it over.
pub fn parse_fragment(url_or_fragment: &str) -> Option<&str> {
    let hash = url_or_fragment.find('#')?;
    let fragment = &url_or_fragment[hash..];
    [FRAGMENT_PREFIX, LEGACY_FRAGMENT_PREFIX]
        .iter()
        .find_map(|prefix| fragment.strip_prefix(prefix))
        .filter(|encoded| !encoded.is_empty())
}

/// `base` without query or fragment, plus `#rpt=<encoded>`.
pub fn snapshot_link(base: &str, encoded: &str) -> String {
    let end = base.find(|c| c == '?' || c == '#').unwrap_or(base.len());
    format!("{}{FRAGMENT_PREFIX}{encoded}", &base[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use marketboard_core::RosterEntity;

    fn state() -> AggregateState {
        let mut state = AggregateState::fresh(&[
            RosterEntity::new("Casino International", "ChIJuXW"),
            RosterEntity::new("Casino Soho", "ChIJTR0c"),
        ]);
        if let Some(r) = state.registry.get_mut("ChIJuXW") {
            r.rating = 4.3;
            r.rating_count = 2154;
            r.location_label = "Rustaveli Ave 5".into();
        }
        state.last_updated = Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
        state
    }

    /// Same steps a browser performs: JSON, encodeURIComponent, btoa.
    fn browser_encode(json: &str) -> String {
        let escaped = utf8_percent_encode(json, URI_COMPONENT).to_string();
        base64::engine::general_purpose::STANDARD.encode(escaped)
    }

    #[test]
    fn round_trip_keeps_names_ratings_counts() {
        let original = state();
        let payload = decode(&encode(&original, Theme::Light).unwrap()).unwrap();
        assert_eq!(payload.theme, Some(Theme::Light));
        assert_eq!(payload.last_updated, original.last_updated);

        let rebuilt = payload.into_aggregate();
        assert!(rebuilt.history.is_empty());
        for (a, b) in original.registry.iter().zip(rebuilt.registry.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.rating, b.rating);
            assert_eq!(a.rating_count, b.rating_count);
            assert_eq!(a.external_id, b.external_id);
            assert_eq!(b.location_label, SNAPSHOT_LOCATION);
            assert_eq!(b.map_link, map_link(&a.name));
        }
    }

    #[test]
    fn wire_layout_is_compact() {
        let encoded = encode(&state(), Theme::Dark).unwrap();
        let escaped = String::from_utf8(
            base64::engine::general_purpose::STANDARD.decode(&encoded).unwrap(),
        )
        .unwrap();
        let json = percent_decode_str(&escaped).decode_utf8().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["c"][0]["n"], "Casino International");
        assert_eq!(value["c"][0]["v"], 2154);
        assert_eq!(value["c"][1]["p"], "ChIJTR0c");
        assert_eq!(value["u"], "2026-03-01T08:00:00.000Z");
        assert_eq!(value["t"], "dark");
        assert!(!escaped.contains('{'));
    }

    #[test]
    fn non_ascii_names_survive() {
        let mut state = state();
        if let Some(r) = state.registry.get_mut("ChIJTR0c") {
            r.name = "კაზინო Სოჰო".into();
        }
        let payload = decode(&encode(&state, Theme::Dark).unwrap()).unwrap();
        assert_eq!(payload.entities[1].name, "კაზინო Სოჰო");
    }

    #[test]
    fn legacy_field_names_migrate() {
        let json = r#"{"c":[
            {"name":"Royal Casino","rating":4.1,"userRatingsTotal":310,"placeId":"royal","address":"Old Town"},
            {"name":"Casino Peace","rating":3.9,"userRatingsTotal":140,"id":"peace"},
            {"rating":4.0}
        ],"updated":"2025-12-31T23:00:00.000Z","t":"light"}"#;
        let wire: Vec<WireEntity> = serde_json::from_str::<serde_json::Value>(json)
            .map(|v| serde_json::from_value(v["c"].clone()).unwrap())
            .unwrap();
        assert!(wire.iter().all(|w| w.schema() == EntitySchema::Legacy));

        let payload = decode(&browser_encode(json)).unwrap();
        let royal = &payload.entities[0];
        assert_eq!(royal.external_id, "royal");
        assert_eq!(royal.rating_count, 310);
        assert_eq!(royal.location_label.as_deref(), Some("Old Town"));
        assert_eq!(payload.entities[1].external_id, "peace");

        // No id, no name: random id doubles as the name.
        let anonymous = &payload.entities[2];
        assert!(uuid::Uuid::parse_str(&anonymous.external_id).is_ok());
        assert_eq!(anonymous.name, anonymous.external_id);
        assert_eq!(anonymous.rating_count, 0);

        assert_eq!(
            payload.last_updated,
            Some(Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap())
        );
        assert_eq!(payload.theme, Some(Theme::Light));

        let rebuilt = payload.into_aggregate();
        assert_eq!(rebuilt.registry.get("royal").unwrap().location_label, "Old Town");
        assert_eq!(rebuilt.registry.get("peace").unwrap().location_label, SNAPSHOT_LOCATION);
    }

    #[test]
    fn compact_fields_take_precedence() {
        let json = r#"{"c":[{"n":"Soho","name":"Old Soho","p":"s1","placeId":"s0","v":9,"userRatingsTotal":1}]}"#;
        let payload = decode(&browser_encode(json)).unwrap();
        let e = &payload.entities[0];
        assert_eq!((e.name.as_str(), e.external_id.as_str(), e.rating_count), ("Soho", "s1", 9));
        assert_eq!(payload.last_updated, None);
        assert_eq!(payload.theme, None);
    }

    #[test]
    fn zero_compact_values_fall_back_to_long_fields() {
        let json = r#"{"c":[{"n":"Soho","p":"s1","r":0,"rating":4.5,"v":0,"userRatingsTotal":12}]}"#;
        let e = &decode(&browser_encode(json)).unwrap().entities[0];
        assert_eq!(e.rating, 4.5);
        assert_eq!(e.rating_count, 12);

        let json = r#"{"c":[{"n":"Soho","p":"s1","r":0,"v":0}]}"#;
        let e = &decode(&browser_encode(json)).unwrap().entities[0];
        assert_eq!((e.rating, e.rating_count), (0.0, 0));
    }

    #[test]
    fn null_or_missing_entity_list_is_empty() {
        for json in [r#"{"c":null,"t":"dark"}"#, r#"{"t":"dark"}"#] {
            let payload = decode(&browser_encode(json)).unwrap();
            assert!(payload.entities.is_empty());
            assert_eq!(payload.theme, Some(Theme::Dark));
        }
    }

    #[test]
    fn unpadded_and_wrapped_input_decodes() {
        let encoded = encode(&state(), Theme::Dark).unwrap();
        let trimmed = encoded.trim_end_matches('=');
        assert!(decode(trimmed).is_ok());
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        assert!(decode(&wrapped).is_ok());
    }

    #[test]
    fn lenient_about_bad_theme_and_timestamp() {
        let json = r#"{"c":[],"u":"yesterday","t":"sepia"}"#;
        let payload = decode(&browser_encode(json)).unwrap();
        assert!(payload.entities.is_empty());
        assert_eq!(payload.last_updated, None);
        assert_eq!(payload.theme, None);
    }

    #[test]
    fn typed_decode_errors() {
        assert!(matches!(decode("not base64!"), Err(DecodeError::Transport(_))));

        let bad_utf8 = base64::engine::general_purpose::STANDARD.encode("%FF%FE");
        assert!(matches!(decode(&bad_utf8), Err(DecodeError::Text(_))));

        let not_json = browser_encode("{\"c\": [");
        assert!(matches!(decode(&not_json), Err(DecodeError::Json(_))));
    }

    #[test]
    fn fragment_prefixes() {
        assert_eq!(parse_fragment("https://board.example/#rpt=abc"), Some("abc"));
        assert_eq!(parse_fragment("https://board.example/app?x=1#report=xyz="), Some("xyz="));
        assert_eq!(parse_fragment("#rpt=abc"), Some("abc"));
        assert_eq!(parse_fragment("https://board.example/#rpt="), None);
        assert_eq!(parse_fragment("https://board.example/#other=abc"), None);
        assert_eq!(parse_fragment("rpt=abc"), None);
    }

    #[test]
    fn snapshot_link_replaces_query_and_fragment() {
        assert_eq!(
            snapshot_link("https://board.example/app?ref=mail#rpt=old", "NEW"),
            "https://board.example/app#rpt=NEW"
        );
        assert_eq!(snapshot_link("", "NEW"), "#rpt=NEW");
    }

    #[test]
    fn schema_versions() {
        assert_eq!(EntitySchema::Legacy.version(), 0);
        assert_eq!(EntitySchema::Compact.version(), 1);
        let compact = WireEntity { n: Some("x".into()), ..WireEntity::default() };
        assert_eq!(compact.schema(), EntitySchema::Compact);
    }
}
