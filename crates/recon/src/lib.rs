//! `marketboard-recon`: roster reconciliation engine.
//!
//! Pure engine crate: receives live lookup results, returns the reconciled
//! registry and bounded history. Storage, location and the lookup itself are
//! injected through traits.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod projector;
pub mod schedule;
pub mod source;

pub use config::RegistryConfig;
pub use engine::{reconcile, CycleOutcome, CycleToken, Engine, Origin};
pub use error::{EngineError, ReconError, SourceError};
pub use history::HistoryPolicy;
pub use model::{CycleReport, LiveRecord, MergeReport};
pub use normalize::{normalize, Normalizer};
pub use source::{Coordinates, DataSource, QueryRequest};
