use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use marketboard_core::{EntityRecord, Registry};

/// Name fragment identifying the highlighted subject entity.
pub const DEFAULT_SUBJECT_KEY: &str = "international";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Rating,
    RatingCount,
    LocationLabel,
    ExternalId,
    MapLink,
}

impl SortKey {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Rating | Self::RatingCount)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Rating => "rating",
            Self::RatingCount => "ratingCount",
            Self::LocationLabel => "locationLabel",
            Self::ExternalId => "externalId",
            Self::MapLink => "mapLink",
        }
    }

    fn compare(&self, a: &EntityRecord, b: &EntityRecord) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::Rating => a.rating.total_cmp(&b.rating),
            Self::RatingCount => a.rating_count.cmp(&b.rating_count),
            Self::LocationLabel => a.location_label.cmp(&b.location_label),
            Self::ExternalId => a.external_id.cmp(&b.external_id),
            Self::MapLink => a.map_link.cmp(&b.map_link),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "name" | "venue" => Ok(Self::Name),
            "rating" | "score" => Ok(Self::Rating),
            "ratingcount" | "count" | "volume" => Ok(Self::RatingCount),
            "locationlabel" | "location" => Ok(Self::LocationLabel),
            "externalid" | "id" => Ok(Self::ExternalId),
            "maplink" | "maps" => Ok(Self::MapLink),
            _ => Err(format!("unknown sort key: \"{s}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Current table ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::RatingCount,
            direction: SortDirection::Descending,
        }
    }
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header-click rule: a new key starts descending, re-selecting the
    /// current key flips the direction.
    pub fn select(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Descending)
        }
    }
}

/// Filter by case-insensitive name substring, then order. Stable: ties keep
/// registry order.
pub fn project(registry: &Registry, search: &str, sort: Option<SortState>) -> Vec<EntityRecord> {
    let needle = search.to_lowercase();
    let mut rows: Vec<EntityRecord> = registry
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    if let Some(state) = sort {
        rows.sort_by(|a, b| {
            let ord = state.key.compare(a, b);
            match state.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
    rows
}

/// Id of the first record whose name contains `subject_key`, case-insensitively.
pub fn subject_id<'a>(registry: &'a Registry, subject_key: &str) -> Option<&'a str> {
    let key = subject_key.to_lowercase();
    if key.is_empty() {
        return None;
    }
    registry
        .iter()
        .find(|r| r.name.to_lowercase().contains(&key))
        .map(|r| r.id.as_str())
}

/// Headline figures over the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub entities: usize,
    /// Records with at least one rating.
    pub observed: usize,
    pub total_ratings: u64,
    /// Mean rating over observed records.
    pub mean_rating: Option<f64>,
    pub subject_id: Option<String>,
    /// 1-based position by rating count; ties share a rank.
    pub subject_rank: Option<usize>,
    /// Subject's percentage of all ratings.
    pub subject_share: Option<f64>,
}

pub fn summarize(registry: &Registry, subject_key: &str) -> MarketSummary {
    let observed: Vec<&EntityRecord> = registry.iter().filter(|r| !r.is_placeholder()).collect();
    let total_ratings = observed
        .iter()
        .map(|r| r.rating_count)
        .fold(0u64, u64::saturating_add);
    let mean_rating = (!observed.is_empty())
        .then(|| observed.iter().map(|r| r.rating).sum::<f64>() / observed.len() as f64);

    let subject = subject_id(registry, subject_key).and_then(|id| registry.get(id));
    let subject_rank = subject.filter(|s| !s.is_placeholder()).map(|s| {
        1 + registry.iter().filter(|r| r.rating_count > s.rating_count).count()
    });
    let subject_share = subject
        .filter(|_| total_ratings > 0)
        .map(|s| s.rating_count as f64 * 100.0 / total_ratings as f64);

    MarketSummary {
        entities: registry.len(),
        observed: observed.len(),
        total_ratings,
        mean_rating,
        subject_id: subject.map(|s| s.id.clone()),
        subject_rank,
        subject_share,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Star {
    Full,
    Half,
    Empty,
}

/// Tolerance for reading decimal ratings stored as binary floats
/// (`4.3 - 4.0` is `0.29999...`).
const FRACTION_EPSILON: f64 = 1e-9;

/// Five-star rendering of a 0..=5 rating.
///
/// Full stars are the whole part of the rating. A half star follows when
/// the fractional part lies in `[0.3, 0.7]`; anything else rounds down.
pub fn star_glyphs(rating: f64) -> [Star; 5] {
    let rating = if rating.is_finite() { rating.clamp(0.0, 5.0) } else { 0.0 };
    let whole = rating.floor();
    let fraction = rating - whole;
    let full = whole as u32;
    let half = fraction >= 0.3 - FRACTION_EPSILON && fraction <= 0.7 + FRACTION_EPSILON;

    let mut stars = [Star::Empty; 5];
    for (i, star) in stars.iter_mut().enumerate() {
        let position = i as u32 + 1;
        if position <= full {
            *star = Star::Full;
        } else if position == full + 1 && half {
            *star = Star::Half;
        }
    }
    stars
}
