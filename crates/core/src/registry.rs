use serde::{Deserialize, Serialize};

use crate::entity::EntityRecord;

/// Ordered mapping from external id to exactly one record.
///
/// Iteration order is insertion order, which the merger keeps equal to
/// roster order. Duplicate ids are rejected at construction: the first
/// occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityRecord>", into = "Vec<EntityRecord>")]
pub struct Registry {
    records: Vec<EntityRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.insert(record);
        }
        registry
    }

    /// Append a record. Returns false (and drops it) if the id is already present.
    pub fn insert(&mut self, record: EntityRecord) -> bool {
        if self.contains(&record.external_id) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.position(external_id).is_some()
    }

    pub fn get(&self, external_id: &str) -> Option<&EntityRecord> {
        self.position(external_id).map(|i| &self.records[i])
    }

    pub fn get_mut(&mut self, external_id: &str) -> Option<&mut EntityRecord> {
        self.position(external_id).map(move |i| &mut self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EntityRecord> {
        self.records
    }

    /// Rating counts in iteration order.
    pub fn rating_counts(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.rating_count).collect()
    }

    /// True once any record carries live observations.
    pub fn has_observations(&self) -> bool {
        self.records.iter().any(|r| r.rating_count > 0)
    }

    fn position(&self, external_id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.external_id == external_id)
    }
}

impl From<Vec<EntityRecord>> for Registry {
    fn from(records: Vec<EntityRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<Registry> for Vec<EntityRecord> {
    fn from(registry: Registry) -> Self {
        registry.records
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a EntityRecord;
    type IntoIter = std::slice::Iter<'a, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::RosterEntity;

    fn record(name: &str, id: &str, count: u64) -> EntityRecord {
        let mut r = EntityRecord::placeholder(&RosterEntity::new(name, id));
        r.rating_count = count;
        r
    }

    #[test]
    fn first_duplicate_wins() {
        let registry = Registry::from_records(vec![
            record("A", "a", 1),
            record("B", "b", 2),
            record("A again", "a", 3),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").unwrap().name, "A");
        assert_eq!(registry.rating_counts(), vec![1, 2]);
    }

    #[test]
    fn observations_flag() {
        let empty = Registry::from_records(vec![record("A", "a", 0)]);
        assert!(!empty.has_observations());
        let live = Registry::from_records(vec![record("A", "a", 0), record("B", "b", 7)]);
        assert!(live.has_observations());
    }

    #[test]
    fn serializes_as_ordered_array() {
        let registry = Registry::from_records(vec![record("Z", "z", 0), record("A", "a", 0)]);
        let json = serde_json::to_value(&registry).unwrap();
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["externalId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["z", "a"]);

        let back: Registry = serde_json::from_value(json).unwrap();
        assert_eq!(back, registry);
    }
}
