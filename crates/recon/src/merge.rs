use log::debug;
use marketboard_core::{EntityRecord, Registry, RosterEntity};

use crate::matcher::EntityMatcher;
use crate::model::{LiveRecord, MergeReport};
use crate::normalize::Normalizer;

/// Fold live records and the previous registry into a new registry.
///
/// Seeds one record per roster entity (previous record if known, else a
/// placeholder), then applies every matched live record that carries
/// observations. The roster fixes membership and display names; a live
/// record with `rating_count == 0` never changes anything.
pub fn merge(
    previous: Option<&Registry>,
    roster: &[RosterEntity],
    live: &[LiveRecord],
    normalizer: &Normalizer,
) -> (Registry, MergeReport) {
    let mut registry = seed(previous, roster);
    let matcher = EntityMatcher::new(roster, normalizer);
    let mut report = MergeReport::default();

    for record in live {
        let Some(target) = matcher.resolve(record, &registry) else {
            debug!("discarding unmatched live record '{}'", record.name);
            report.unmatched += 1;
            continue;
        };

        if record.rating_count == 0 {
            debug!("'{}' carried no observations, keeping {}", record.name, target.external_id);
            report.ignored_empty += 1;
            continue;
        }

        if let Some(existing) = registry.get_mut(&target.external_id) {
            debug!(
                "'{}' -> {} ({:?}): {} ratings",
                record.name, target.external_id, target.kind, record.rating_count
            );
            apply(existing, record);
            report.applied += 1;
        }
    }

    (registry, report)
}

fn seed(previous: Option<&Registry>, roster: &[RosterEntity]) -> Registry {
    Registry::from_records(roster.iter().map(|entity| {
        match previous.and_then(|p| p.get(&entity.external_id)) {
            Some(prior) => EntityRecord {
                id: entity.external_id.clone(),
                name: entity.name.clone(),
                ..prior.clone()
            },
            None => EntityRecord::placeholder(entity),
        }
    }))
}

fn apply(existing: &mut EntityRecord, live: &LiveRecord) {
    existing.rating = live.rating;
    existing.rating_count = live.rating_count;
    if let Some(label) = non_blank(&live.location_label) {
        existing.location_label = label.to_string();
    }
    if let Some(link) = non_blank(&live.map_link) {
        existing.map_link = link.to_string();
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
