use std::collections::HashSet;

use chrono::{Duration, FixedOffset};
use serde::Deserialize;

use marketboard_core::roster::{default_roster, DEFAULT_LOCATION_HINT};
use marketboard_core::RosterEntity;

use crate::error::ReconError;
use crate::history::{HistoryPolicy, DEFAULT_CAPACITY, DEFAULT_MIN_INTERVAL_HOURS};
use crate::normalize::{Normalizer, DEFAULT_STOP_WORDS};
use crate::projector::DEFAULT_SUBJECT_KEY;
use crate::schedule::DEFAULT_DAILY_REFRESH_HOUR;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Deploy-time description of what is tracked and how it is reconciled.
///
/// Every section is optional; an empty document yields the compiled-in
/// roster and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_location_hint")]
    pub location_hint: String,
    #[serde(default = "default_roster")]
    pub roster: Vec<RosterEntity>,
    #[serde(default = "default_subject_key")]
    pub subject_key: String,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_name() -> String {
    "Market Registry".into()
}

fn default_location_hint() -> String {
    DEFAULT_LOCATION_HINT.into()
}

fn default_subject_key() -> String {
    DEFAULT_SUBJECT_KEY.into()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            location_hint: default_location_hint(),
            roster: default_roster(),
            subject_key: default_subject_key(),
            matching: MatchingConfig::default(),
            history: HistoryConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_min_interval_hours")]
    pub min_interval_hours: u32,
    /// Calendar-day offset from UTC in minutes. Unset = caller's local offset.
    #[serde(default)]
    pub calendar_offset_minutes: Option<i32>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_min_interval_hours() -> u32 {
    DEFAULT_MIN_INTERVAL_HOURS as u32
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            min_interval_hours: default_min_interval_hours(),
            calendar_offset_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_refresh_hour")]
    pub daily_refresh_hour: u32,
}

fn default_refresh_hour() -> u32 {
    DEFAULT_DAILY_REFRESH_HOUR
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_refresh_hour: default_refresh_hour(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl RegistryConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RegistryConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.roster.is_empty() {
            return Err(ReconError::ConfigValidation("roster must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for entity in &self.roster {
            if entity.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "roster entry '{}' has an empty name",
                    entity.external_id
                )));
            }
            if entity.external_id.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "roster entry '{}' has an empty external_id",
                    entity.name
                )));
            }
            if !seen.insert(entity.external_id.as_str()) {
                return Err(ReconError::DuplicateId(entity.external_id.clone()));
            }
        }

        if self.history.capacity == 0 {
            return Err(ReconError::ConfigValidation(
                "history.capacity must be at least 1".into(),
            ));
        }

        if self.schedule.daily_refresh_hour > 23 {
            return Err(ReconError::ConfigValidation(format!(
                "schedule.daily_refresh_hour must be 0-23, got {}",
                self.schedule.daily_refresh_hour
            )));
        }

        if let Some(minutes) = self.history.calendar_offset_minutes {
            if self.calendar_offset(minutes).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "history.calendar_offset_minutes out of range: {minutes}"
                )));
            }
        }

        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(&self.matching.stop_words)
    }

    /// History policy, using `local_offset` unless the config pins one.
    pub fn history_policy(&self, local_offset: FixedOffset) -> HistoryPolicy {
        let calendar_offset = self
            .history
            .calendar_offset_minutes
            .and_then(|m| self.calendar_offset(m))
            .unwrap_or(local_offset);
        HistoryPolicy {
            capacity: self.history.capacity,
            min_interval: Duration::hours(i64::from(self.history.min_interval_hours)),
            calendar_offset,
        }
    }

    /// Offset for the calendar-date and daily-refresh rules.
    pub fn effective_offset(&self, local_offset: FixedOffset) -> FixedOffset {
        self.history_policy(local_offset).calendar_offset
    }

    fn calendar_offset(&self, minutes: i32) -> Option<FixedOffset> {
        minutes.checked_mul(60).and_then(FixedOffset::east_opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RegistryConfig::from_toml("").unwrap();
        assert_eq!(config.roster.len(), 12);
        assert_eq!(config.location_hint, "Batumi, Georgia");
        assert_eq!(config.history.capacity, 1000);
        assert_eq!(config.schedule.daily_refresh_hour, 9);
        assert_eq!(config.normalizer(), Normalizer::default());
    }

    #[test]
    fn full_document() {
        let toml = r#"
name = "Tbilisi Hotels"
location_hint = "Tbilisi, Georgia"
subject_key = "rooms"

[[roster]]
name = "Rooms Hotel"
external_id = "h1"

[[roster]]
name = "Stamba Hotel"
external_id = "h2"

[matching]
stop_words = ["hotel", "tbilisi"]

[history]
capacity = 50
min_interval_hours = 12
calendar_offset_minutes = 240

[schedule]
daily_refresh_hour = 7
"#;
        let config = RegistryConfig::from_toml(toml).unwrap();
        assert_eq!(config.roster[1], RosterEntity::new("Stamba Hotel", "h2"));
        assert_eq!(config.normalizer().key("Stamba Hotel Tbilisi"), "stamba");

        let policy = config.history_policy(FixedOffset::east_opt(0).unwrap());
        assert_eq!(policy.capacity, 50);
        assert_eq!(policy.min_interval, Duration::hours(12));
        assert_eq!(policy.calendar_offset, FixedOffset::east_opt(4 * 3600).unwrap());
    }

    #[test]
    fn local_offset_used_when_unpinned() {
        let config = RegistryConfig::default();
        let local = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(config.effective_offset(local), local);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let toml = r#"
[[roster]]
name = "A"
external_id = "x"

[[roster]]
name = "B"
external_id = "x"
"#;
        let err = RegistryConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, ReconError::DuplicateId(ref id) if id == "x"));
    }

    #[test]
    fn validation_errors() {
        let cases = [
            "roster = []",
            "[[roster]]\nname = \"\"\nexternal_id = \"x\"",
            "[[roster]]\nname = \"A\"\nexternal_id = \" \"",
            "[history]\ncapacity = 0",
            "[schedule]\ndaily_refresh_hour = 24",
            "[history]\ncalendar_offset_minutes = 100000",
        ];
        for case in cases {
            let err = RegistryConfig::from_toml(case).unwrap_err();
            assert!(matches!(err, ReconError::ConfigValidation(_)), "{case}: {err}");
        }
    }

    #[test]
    fn parse_errors() {
        let err = RegistryConfig::from_toml("roster = 5").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
