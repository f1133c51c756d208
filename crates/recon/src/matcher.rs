use marketboard_core::{Registry, RosterEntity};

use crate::model::LiveRecord;
use crate::normalize::Normalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The live record carried an id already in the registry.
    ExactId,
    /// Resolved by canonical-key containment against the roster.
    CanonicalName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMatch {
    pub external_id: String,
    pub kind: MatchKind,
}

/// Two-tier resolver from live records to roster identities.
///
/// 1. Exact external id, if present in the registry. Always wins.
/// 2. Otherwise the first roster entry, in roster order, whose canonical key
///    equals, contains, or is contained in the live key.
///
/// Containment is a coarse approximation: a short key can sit inside several
/// roster keys and the earliest roster entry takes it. An empty key on either
/// side never matches, since it would be contained in everything.
pub struct EntityMatcher<'a> {
    roster: &'a [RosterEntity],
    roster_keys: Vec<String>,
    normalizer: &'a Normalizer,
}

impl<'a> EntityMatcher<'a> {
    pub fn new(roster: &'a [RosterEntity], normalizer: &'a Normalizer) -> Self {
        let roster_keys = roster.iter().map(|e| normalizer.key(&e.name)).collect();
        Self {
            roster,
            roster_keys,
            normalizer,
        }
    }

    pub fn resolve(&self, live: &LiveRecord, registry: &Registry) -> Option<EntityMatch> {
        if let Some(id) = live.id() {
            if registry.contains(id) {
                return Some(EntityMatch {
                    external_id: id.to_string(),
                    kind: MatchKind::ExactId,
                });
            }
        }

        let live_key = self.normalizer.key(&live.name);
        if live_key.is_empty() {
            return None;
        }

        self.roster
            .iter()
            .zip(&self.roster_keys)
            .find(|(_, key)| {
                !key.is_empty()
                    && (live_key == **key || live_key.contains(key.as_str()) || key.contains(&live_key))
            })
            .map(|(entity, _)| EntityMatch {
                external_id: entity.external_id.clone(),
                kind: MatchKind::CanonicalName,
            })
    }
}

/// One-shot resolution. Prefer [`EntityMatcher`] when resolving many records.
pub fn match_entity(
    live: &LiveRecord,
    roster: &[RosterEntity],
    registry: &Registry,
    normalizer: &Normalizer,
) -> Option<String> {
    EntityMatcher::new(roster, normalizer)
        .resolve(live, registry)
        .map(|m| m.external_id)
}
