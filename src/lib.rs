//! Counterplay: opponent modeling for repeated rock/paper/scissors combat.
//!
//! The engine keeps a bounded history per opponent, runs a set of base
//! predictors over it, expands each into counter-of-counter meta levels and
//! picks an action through a Hedge ensemble or Thompson sampling. A losing
//! streak switches it to random play.
//!
//! ```no_run
//! use counterplay::{Engine, EngineConfig, MoveSet};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let decision = engine.choose_action("goblin-42", 1, MoveSet::ALL, None)?;
//! engine.observe_named("goblin-42", 1, decision.action.name(), "rock")?;
//! # Ok::<(), counterplay::EngineError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod predict;
pub mod simulate;
pub mod store;

pub use config::{EngineConfig, SelectionMode};
pub use engine::{Decision, Diagnostics, Engine, Reasoning};
pub use error::EngineError;
pub use game::{Charges, Distribution, Move, MoveSet, Outcome, StatLine, WeaponStats};
pub use store::OpponentSummary;
