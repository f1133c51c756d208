// Compiled-in roster. Changing it is a deployment, not a runtime operation.

use crate::entity::RosterEntity;

pub const DEFAULT_LOCATION_HINT: &str = "Batumi, Georgia";

const DEFAULT_ROSTER: &[(&str, &str)] = &[
    ("Casino International", "ChIJuXW-p9-HZ0ARF0k28v9fE-g"),
    ("Casino Iveria Batumi", "ChIJ7wL_S9yHZ0ARmH1f_9fE-g"),
    ("Casino Peace", "ChIJQ67_S9yHZ0AR-H1f_9fE-g"),
    ("Princess Casino", "ChIJtX_S_9yHZ0ARiH1f_9fE-g"),
    ("Eclipse Casino", "ChIJu_S_S9yHZ0ARmX1f_9fE-g"),
    ("Casino Otium", "ChIJu-Otium-PlaceID"),
    ("Casino Soho", "ChIJTR0cAQCHZ0ARE7aWIZhZGuU"),
    ("Royal Casino", "ChIJRoyal-Casino-PlaceID"),
    ("Empire Casino", "ChIJEmpire-Casino-PlaceID"),
    ("Grand Bellagio", "ChIJCz76Zk-FZ0ARz1T95QGgJA8"),
    ("Billionaire Casino", "ChIJ8U3Z0teHZ0AR8_6pXn_pXnc"),
    ("Casino Colosseum", "ChIJYYGQeIuFZ0ARmkcRZU1VJOA"),
];

pub fn default_roster() -> Vec<RosterEntity> {
    DEFAULT_ROSTER
        .iter()
        .map(|(name, id)| RosterEntity::new(*name, *id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_roster_ids_are_unique() {
        let roster = default_roster();
        let ids: HashSet<&str> = roster.iter().map(|e| e.external_id.as_str()).collect();
        assert_eq!(ids.len(), roster.len());
        assert_eq!(roster.len(), 12);
    }
}
