use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::Serialize;

use marketboard_core::{HistorySnapshot, Registry};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_MIN_INTERVAL_HOURS: i64 = 6;

/// Why a snapshot was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordReason {
    /// No prior snapshot.
    First,
    /// The ordered rating-count vector changed.
    CountsChanged,
    /// First cycle of a new calendar day.
    NewDay,
    /// Unchanged, but the minimum interval has passed.
    IntervalElapsed,
}

/// Decides when the registry is worth a history entry, and bounds the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Most recent snapshots kept; older ones are evicted first.
    pub capacity: usize,
    /// Unchanged registries are re-recorded only after this much time.
    pub min_interval: Duration,
    /// Offset whose wall clock defines a calendar day.
    pub calendar_offset: FixedOffset,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            min_interval: Duration::hours(DEFAULT_MIN_INTERVAL_HOURS),
            calendar_offset: utc_offset(),
        }
    }
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}

impl HistoryPolicy {
    pub fn should_record(
        &self,
        history: &[HistorySnapshot],
        registry: &Registry,
        now: DateTime<Utc>,
    ) -> bool {
        self.record_reason(history, registry, now).is_some()
    }

    /// `None` when nothing should be recorded. A registry without a single
    /// observation is never recorded.
    pub fn record_reason(
        &self,
        history: &[HistorySnapshot],
        registry: &Registry,
        now: DateTime<Utc>,
    ) -> Option<RecordReason> {
        if !registry.has_observations() {
            return None;
        }

        let Some(last) = history.last() else {
            return Some(RecordReason::First);
        };

        if last.rating_counts() != registry.rating_counts() {
            Some(RecordReason::CountsChanged)
        } else if self.calendar_date(last.timestamp) != self.calendar_date(now) {
            Some(RecordReason::NewDay)
        } else if now - last.timestamp > self.min_interval {
            Some(RecordReason::IntervalElapsed)
        } else {
            None
        }
    }

    /// Append and evict the oldest entries beyond capacity.
    pub fn append(
        &self,
        mut history: Vec<HistorySnapshot>,
        snapshot: HistorySnapshot,
    ) -> Vec<HistorySnapshot> {
        history.push(snapshot);
        self.truncate(history)
    }

    pub fn truncate(&self, mut history: Vec<HistorySnapshot>) -> Vec<HistorySnapshot> {
        if history.len() > self.capacity {
            let excess = history.len() - self.capacity;
            history.drain(..excess);
        }
        history
    }

    fn calendar_date(&self, at: DateTime<Utc>) -> chrono::NaiveDate {
        at.with_timezone(&self.calendar_offset).date_naive()
    }
}
