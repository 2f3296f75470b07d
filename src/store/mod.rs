//! Opponent state storage.
//!
//! One [`OpponentRecord`] per opponent id: bounded move windows for both
//! sides, incrementally maintained pattern tables, per-strategy scores and
//! posteriors, and the results of the latest analysis pass.

pub mod opponents;
pub mod patterns;
pub mod record;

pub use opponents::{lock_record, OpponentStore, RecordHandle};
pub use patterns::{PatternKey, TransitionCounts, TransitionTable, MAX_PATTERN_ORDER};
pub use record::{EntropyCache, OpponentRecord, OpponentSummary, StrategyEntry};
