use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityRecord, RosterEntity};
use crate::registry::Registry;

/// Immutable copy of the registry taken at one reconciliation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "casinos")]
    pub entities: Vec<EntityRecord>,
}

impl HistorySnapshot {
    pub fn capture(registry: &Registry, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            entities: registry.records().to_vec(),
        }
    }

    pub fn rating_counts(&self) -> Vec<u64> {
        self.entities.iter().map(|e| e.rating_count).collect()
    }
}

/// Everything persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    #[serde(alias = "casinos")]
    pub registry: Registry,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<HistorySnapshot>,
}

impl AggregateState {
    /// First-run state: one placeholder per roster entity, no history.
    pub fn fresh(roster: &[RosterEntity]) -> Self {
        Self {
            registry: Registry::from_records(roster.iter().map(EntityRecord::placeholder)),
            last_updated: None,
            history: Vec::new(),
        }
    }

    pub fn latest_snapshot(&self) -> Option<&HistorySnapshot> {
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_all_placeholders() {
        let roster = vec![RosterEntity::new("A", "a"), RosterEntity::new("B", "b")];
        let state = AggregateState::fresh(&roster);
        assert_eq!(state.registry.len(), 2);
        assert!(state.registry.iter().all(EntityRecord::is_placeholder));
        assert!(state.last_updated.is_none());
        assert!(state.history.is_empty());
    }

    #[test]
    fn reads_legacy_persisted_layout() {
        let json = r#"{
            "casinos": [
                {"id": "a", "placeId": "a", "name": "A", "rating": 4.0,
                 "userRatingsTotal": 10, "vicinity": "Somewhere",
                 "googleMapsUri": "https://maps.example/a"}
            ],
            "lastUpdated": "2026-03-01T08:00:00.000Z",
            "history": [
                {"timestamp": "2026-03-01T08:00:00.000Z", "casinos": [
                    {"id": "a", "placeId": "a", "name": "A", "rating": 4.0,
                     "userRatingsTotal": 10, "vicinity": "Somewhere",
                     "googleMapsUri": "https://maps.example/a"}
                ]}
            ]
        }"#;
        let state: AggregateState = serde_json::from_str(json).unwrap();
        assert_eq!(state.registry.rating_counts(), vec![10]);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.latest_snapshot().unwrap().rating_counts(), vec![10]);
    }
}
