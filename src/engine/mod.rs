//! The decision engine.
//!
//! Owns the opponent store, the global Hedge ensemble and the bandit
//! selector. Two entry points drive it: [`Engine::choose_action`] before a
//! round and [`Engine::observe`] after it. Both lock the opponent's record
//! first and the ensemble second, never the other way round.
//!
//! All randomness is drawn from an RNG seeded by the configured seed, the
//! opponent id, the observation count and the turn, so asking twice for the
//! same turn gives the same answer.

mod combiner;
pub mod decision;
mod feedback;

pub use decision::{Decision, Diagnostics, Reasoning, StrategyScore};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::predict::{BanditSelector, MemberSnapshot, Predictor, WeightedEnsemble, ALL_PREDICTORS};
use crate::store::{lock_record, OpponentRecord, OpponentStore, OpponentSummary};

/// Opponent-modeling engine. `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: OpponentStore,
    ensemble: Mutex<WeightedEnsemble<Predictor>>,
    bandit: BanditSelector,
}

impl Engine {
    /// Creates an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ensemble = WeightedEnsemble::new(
            ALL_PREDICTORS,
            config.eta,
            config.min_weight,
            config.outcome_window,
        );
        Ok(Engine {
            store: OpponentStore::new(config.window),
            ensemble: Mutex::new(ensemble),
            bandit: BanditSelector::new(config.bandit_candidates.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Forgets everything learned about `opponent`. Returns whether the
    /// opponent was known. Ensemble weights are global and are kept.
    pub fn reset(&self, opponent: &str) -> Result<bool, EngineError> {
        self.store.reset(opponent)
    }

    /// Known opponent ids, sorted.
    pub fn opponents(&self) -> Result<Vec<String>, EngineError> {
        self.store.ids()
    }

    /// What has been learned about `opponent`, if anything.
    pub fn summary(&self, opponent: &str) -> Result<Option<OpponentSummary>, EngineError> {
        let Some(handle) = self.store.get(opponent)? else {
            return Ok(None);
        };
        let mut record = lock_record(&handle)?;
        Ok(Some(record.summary(opponent)))
    }

    /// A copy of the opponent's record.
    pub fn record_snapshot(&self, opponent: &str) -> Result<Option<OpponentRecord>, EngineError> {
        let Some(handle) = self.store.get(opponent)? else {
            return Ok(None);
        };
        let record = lock_record(&handle)?;
        Ok(Some(record.clone()))
    }

    /// Current Hedge weights of the base predictors.
    pub fn ensemble_weights(&self) -> Result<Vec<MemberSnapshot<Predictor>>, EngineError> {
        Ok(self.lock_ensemble()?.snapshot())
    }

    fn lock_ensemble(&self) -> Result<MutexGuard<'_, WeightedEnsemble<Predictor>>, EngineError> {
        self.ensemble
            .lock()
            .map_err(|_| EngineError::StateCorruption("ensemble lock poisoned".to_string()))
    }

    fn decision_rng(&self, opponent: &str, observations: u64, turn: u32) -> SmallRng {
        let mut hasher = DefaultHasher::new();
        (self.config.seed, opponent, observations, turn).hash(&mut hasher);
        SmallRng::seed_from_u64(hasher.finish())
    }

    /// Scales confidence down while few rounds have been seen.
    fn evidence(&self, observations: u64) -> f64 {
        (observations as f64 / self.config.confidence_ramp as f64).min(1.0)
    }
}
