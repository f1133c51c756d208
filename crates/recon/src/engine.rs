use chrono::{DateTime, Utc};
use log::{info, warn};

use marketboard_core::store::STATE_KEY;
use marketboard_core::{AggregateState, HistorySnapshot, KeyValueStore, RosterEntity};

use crate::config::RegistryConfig;
use crate::error::EngineError;
use crate::history::HistoryPolicy;
use crate::merge::merge;
use crate::model::{CycleReport, LiveRecord};
use crate::normalize::Normalizer;
use crate::source::{Coordinates, DataSource, QueryRequest};

/// Identifies one reconciliation cycle. Later cycles get larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleToken(u64);

impl CycleToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Applied(CycleReport),
    /// A newer cycle was started, or this one was already applied; the
    /// result was dropped.
    Stale { token: CycleToken, current: CycleToken },
}

/// Where the current state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from (or created for) the local store. Cycles record history
    /// and persist.
    Local,
    /// Reconstructed from a shared report. Never recorded, never persisted.
    Snapshot,
}

/// One full cycle as a pure function: merge, decide on a history entry,
/// stamp `last_updated`.
pub fn reconcile(
    previous: &AggregateState,
    roster: &[RosterEntity],
    live: &[LiveRecord],
    normalizer: &Normalizer,
    policy: &HistoryPolicy,
    now: DateTime<Utc>,
    record_history: bool,
) -> (AggregateState, CycleReport) {
    let (registry, merge_report) = merge(Some(&previous.registry), roster, live, normalizer);

    let recorded = if record_history {
        policy.record_reason(&previous.history, &registry, now)
    } else {
        None
    };

    let mut history = previous.history.clone();
    if recorded.is_some() {
        history = policy.append(history, HistorySnapshot::capture(&registry, now));
    }

    let report = CycleReport {
        merge: merge_report,
        recorded,
        history_len: history.len(),
        last_updated: now,
    };
    let state = AggregateState {
        registry,
        last_updated: Some(now),
        history,
    };
    (state, report)
}

/// Owns the aggregate state and its persistence.
///
/// Every applied cycle replaces the state wholesale; the store is written
/// before the in-memory swap so a failed write leaves both untouched.
pub struct Engine<S: KeyValueStore> {
    config: RegistryConfig,
    normalizer: Normalizer,
    policy: HistoryPolicy,
    store: S,
    state: AggregateState,
    origin: Origin,
    issued: u64,
    /// Last token whose results were applied.
    completed: u64,
}

impl<S: KeyValueStore> Engine<S> {
    /// Load the persisted state, or start fresh.
    ///
    /// Stored JSON that no longer parses is copied to `<key>.corrupt` and
    /// replaced by an all-placeholder registry. Only a failing store read is
    /// an error.
    pub fn open(config: RegistryConfig, policy: HistoryPolicy, mut store: S) -> Result<Self, EngineError> {
        let normalizer = config.normalizer();
        let state = match store.get(STATE_KEY)? {
            None => AggregateState::fresh(&config.roster),
            Some(raw) => match serde_json::from_str::<AggregateState>(&raw) {
                Ok(loaded) => realign(loaded, &config.roster, &normalizer, &policy),
                Err(e) => {
                    let backup = corrupt_key(STATE_KEY);
                    warn!("stored state under '{STATE_KEY}' is unreadable ({e}); starting fresh, original kept in '{backup}'");
                    if let Err(err) = store.set(&backup, &raw) {
                        warn!("could not preserve corrupt state: {err}");
                    }
                    AggregateState::fresh(&config.roster)
                }
            },
        };

        Ok(Self {
            config,
            normalizer,
            policy,
            store,
            state,
            origin: Origin::Local,
            issued: 0,
            completed: 0,
        })
    }

    /// Wrap state decoded from a shared report, shown as received. Cycles
    /// still merge into it but nothing is recorded or written back.
    pub fn from_snapshot(
        config: RegistryConfig,
        policy: HistoryPolicy,
        store: S,
        state: AggregateState,
    ) -> Self {
        let normalizer = config.normalizer();
        Self {
            config,
            normalizer,
            policy,
            store,
            state,
            origin: Origin::Snapshot,
            issued: 0,
            completed: 0,
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn roster(&self) -> &[RosterEntity] {
        &self.config.roster
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a cycle. Any cycle begun earlier becomes stale.
    pub fn begin_cycle(&mut self) -> CycleToken {
        self.issued += 1;
        CycleToken(self.issued)
    }

    pub fn current_token(&self) -> Option<CycleToken> {
        (self.issued > 0).then_some(CycleToken(self.issued))
    }

    pub fn query_request(&self, coordinates: Option<Coordinates>) -> QueryRequest<'_> {
        QueryRequest {
            location_hint: &self.config.location_hint,
            coordinates,
            roster: &self.config.roster,
        }
    }

    /// Apply the live results of cycle `token`, unless a newer cycle exists
    /// or `token` was already applied. A failed store write leaves the token
    /// unused.
    pub fn complete_cycle(
        &mut self,
        token: CycleToken,
        live: &[LiveRecord],
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome, EngineError> {
        let current = CycleToken(self.issued);
        if token.0 <= self.completed {
            warn!(
                "discarding repeated results of cycle {} ({} records)",
                token.0,
                live.len()
            );
            return Ok(CycleOutcome::Stale { token, current });
        }
        if token != current {
            warn!(
                "discarding results of cycle {} ({} records); cycle {} is current",
                token.0,
                live.len(),
                current.0
            );
            return Ok(CycleOutcome::Stale { token, current });
        }

        let local = self.origin == Origin::Local;
        let (next, report) = reconcile(
            &self.state,
            &self.config.roster,
            live,
            &self.normalizer,
            &self.policy,
            now,
            local,
        );

        if local {
            let json = serde_json::to_string(&next)?;
            self.store.set(STATE_KEY, &json)?;
        }

        info!(
            "cycle {}: {} applied, {} empty, {} unmatched; history {}{}",
            token.0,
            report.merge.applied,
            report.merge.ignored_empty,
            report.merge.unmatched,
            report.history_len,
            match report.recorded {
                Some(reason) => format!(" (recorded: {reason:?})"),
                None => String::new(),
            }
        );

        self.state = next;
        self.completed = token.0;
        Ok(CycleOutcome::Applied(report))
    }

    /// Begin a cycle, query `source`, complete. A source failure leaves the
    /// state exactly as it was.
    pub fn refresh(
        &mut self,
        source: &dyn DataSource,
        coordinates: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome, EngineError> {
        let token = self.begin_cycle();
        let live = source.query(&self.query_request(coordinates))?;
        self.complete_cycle(token, &live, now)
    }
}

/// Key under which an unreadable value for `key` is preserved.
pub fn corrupt_key(key: &str) -> String {
    format!("{key}.corrupt")
}

/// Fit loaded state to the current roster and history capacity.
fn realign(
    state: AggregateState,
    roster: &[RosterEntity],
    normalizer: &Normalizer,
    policy: &HistoryPolicy,
) -> AggregateState {
    let (registry, _) = merge(Some(&state.registry), roster, &[], normalizer);
    AggregateState {
        registry,
        last_updated: state.last_updated,
        history: policy.truncate(state.history),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use chrono::{Duration, TimeZone};
    use marketboard_core::{MemoryStore, StoreError};

    struct Feed(Vec<LiveRecord>);

    impl DataSource for Feed {
        fn query(&self, _request: &QueryRequest<'_>) -> Result<Vec<LiveRecord>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    impl DataSource for Down {
        fn query(&self, _request: &QueryRequest<'_>) -> Result<Vec<LiveRecord>, SourceError> {
            Err(SourceError::Unavailable("quota exceeded".into()))
        }
    }

    #[derive(Default)]
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn config() -> RegistryConfig {
        RegistryConfig {
            roster: vec![
                RosterEntity::new("Casino Soho", "soho"),
                RosterEntity::new("Royal Casino", "royal"),
            ],
            ..RegistryConfig::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 10, 0, 0).unwrap()
    }

    fn soho(count: u64) -> LiveRecord {
        LiveRecord::named("Soho", 4.4, count)
    }

    #[test]
    fn first_open_is_fresh() {
        let engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        assert_eq!(engine.origin(), Origin::Local);
        assert_eq!(engine.state().registry.len(), 2);
        assert!(engine.state().history.is_empty());
        assert!(engine.current_token().is_none());
    }

    #[test]
    fn refresh_persists_and_reopens() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        let outcome = engine.refresh(&Feed(vec![soho(812)]), None, t0()).unwrap();
        let CycleOutcome::Applied(report) = outcome else {
            panic!("expected applied cycle");
        };
        assert_eq!(report.merge.applied, 1);
        assert!(report.recorded.is_some());

        let store = engine.store().clone();
        let reopened = Engine::open(config(), HistoryPolicy::default(), store).unwrap();
        assert_eq!(reopened.state(), engine.state());
        assert_eq!(reopened.state().last_updated, Some(t0()));
    }

    #[test]
    fn stale_token_is_discarded() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        let slow = engine.begin_cycle();
        let fast = engine.begin_cycle();
        assert!(fast > slow);

        let applied = engine.complete_cycle(fast, &[soho(900)], t0()).unwrap();
        assert!(matches!(applied, CycleOutcome::Applied(_)));

        let before = engine.state().clone();
        let stale = engine
            .complete_cycle(slow, &[soho(10)], t0() + Duration::minutes(1))
            .unwrap();
        assert_eq!(stale, CycleOutcome::Stale { token: slow, current: fast });
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.state().registry.get("soho").unwrap().rating_count, 900);
    }

    #[test]
    fn token_applies_only_once() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        let token = engine.begin_cycle();

        let first = engine.complete_cycle(token, &[soho(100)], t0()).unwrap();
        assert!(matches!(first, CycleOutcome::Applied(_)));
        let persisted = engine.store().get(STATE_KEY).unwrap();

        let again = engine
            .complete_cycle(token, &[soho(5)], t0() + Duration::hours(7))
            .unwrap();
        assert_eq!(again, CycleOutcome::Stale { token, current: token });
        assert_eq!(engine.state().registry.get("soho").unwrap().rating_count, 100);
        assert_eq!(engine.state().history.len(), 1);
        assert_eq!(engine.store().get(STATE_KEY).unwrap(), persisted);

        let next = engine.begin_cycle();
        let applied = engine.complete_cycle(next, &[soho(5)], t0() + Duration::hours(7)).unwrap();
        assert!(matches!(applied, CycleOutcome::Applied(_)));
        assert_eq!(engine.state().registry.get("soho").unwrap().rating_count, 5);
    }

    #[test]
    fn corrupt_state_recovers_and_is_preserved() {
        let store = MemoryStore::new().with_entry(STATE_KEY, "{\"casinos\": [tru");
        let engine = Engine::open(config(), HistoryPolicy::default(), store).unwrap();
        assert!(engine.state().registry.iter().all(|r| r.is_placeholder()));
        assert_eq!(
            engine.store().get(&corrupt_key(STATE_KEY)).unwrap().as_deref(),
            Some("{\"casinos\": [tru")
        );
    }

    #[test]
    fn source_failure_leaves_state_untouched() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        engine.refresh(&Feed(vec![soho(100)]), None, t0()).unwrap();
        let before = engine.state().clone();

        let err = engine.refresh(&Down, None, t0() + Duration::hours(1)).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn failed_write_keeps_memory_and_disk_consistent() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), ReadOnlyStore).unwrap();
        let err = engine.refresh(&Feed(vec![soho(100)]), None, t0()).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(engine.state().registry.iter().all(|r| r.is_placeholder()));
        assert!(engine.state().last_updated.is_none());
    }

    #[test]
    fn snapshot_origin_never_records_or_persists() {
        let state = AggregateState::fresh(&config().roster);
        let mut engine =
            Engine::from_snapshot(config(), HistoryPolicy::default(), MemoryStore::new(), state);
        let outcome = engine.refresh(&Feed(vec![soho(50)]), None, t0()).unwrap();
        let CycleOutcome::Applied(report) = outcome else {
            panic!("expected applied cycle");
        };
        assert_eq!(report.recorded, None);
        assert_eq!(engine.state().registry.get("soho").unwrap().rating_count, 50);
        assert!(engine.state().history.is_empty());
        assert!(engine.store().get(STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn reopen_realigns_to_changed_roster() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        engine.refresh(&Feed(vec![soho(100)]), None, t0()).unwrap();

        let renamed = RegistryConfig {
            roster: vec![
                RosterEntity::new("Soho Club", "soho"),
                RosterEntity::new("Casino Otium", "otium"),
            ],
            ..RegistryConfig::default()
        };
        let reopened = Engine::open(renamed, HistoryPolicy::default(), engine.store().clone()).unwrap();
        let ids: Vec<&str> = reopened.state().registry.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["soho", "otium"]);
        let soho = reopened.state().registry.get("soho").unwrap();
        assert_eq!(soho.name, "Soho Club");
        assert_eq!(soho.rating_count, 100);
    }

    #[test]
    fn reconcile_is_pure_and_stamps_last_updated() {
        let cfg = config();
        let previous = AggregateState::fresh(&cfg.roster);
        let (next, report) = reconcile(
            &previous,
            &cfg.roster,
            &[soho(5)],
            &cfg.normalizer(),
            &HistoryPolicy::default(),
            t0(),
            true,
        );
        assert_eq!(previous, AggregateState::fresh(&cfg.roster));
        assert_eq!(next.last_updated, Some(t0()));
        assert_eq!(next.history.len(), 1);
        assert_eq!(report.history_len, 1);
    }

    #[test]
    fn size_matches_roster_after_every_cycle() {
        let mut engine = Engine::open(config(), HistoryPolicy::default(), MemoryStore::new()).unwrap();
        let noisy = vec![
            soho(1),
            LiveRecord::named("Unknown Palace", 4.0, 10),
            LiveRecord::named("Royal", 3.0, 2).with_id("not-in-roster"),
            LiveRecord::named("Casino", 5.0, 99),
        ];
        for i in 0..3 {
            engine.refresh(&Feed(noisy.clone()), None, t0() + Duration::hours(i)).unwrap();
            assert_eq!(engine.state().registry.len(), 2);
        }
    }
}
