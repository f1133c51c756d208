//! `marketboard-core`: shared data model.
//!
//! Roster, registry, history and the key-value store seam. No matching or
//! reconciliation logic lives here.

pub mod entity;
pub mod registry;
pub mod roster;
pub mod state;
pub mod store;
pub mod theme;

pub use entity::{map_link, EntityRecord, RosterEntity, PLACEHOLDER_LOCATION};
pub use registry::Registry;
pub use state::{AggregateState, HistorySnapshot};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use theme::Theme;
