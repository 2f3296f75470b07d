//! Engine configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Loaded from JSON with [`load_config`] or [`EngineConfig::from_json_str`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::predict::{MetaLevel, StrategyKey, ALL_PREDICTORS};

/// How the statistical recommendation is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Hedge-weighted blend of every base predictor's best meta level.
    #[default]
    Ensemble,
    /// Thompson sampling over `bandit_candidates`.
    Bandit,
}

/// Tunables for one [`crate::engine::Engine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Moves kept per history window.
    pub window: usize,
    /// Hedge learning rate.
    pub eta: f64,
    /// Hedge weight floor.
    pub min_weight: f64,
    /// Per-observation decay of meta-strategy scores.
    pub meta_score_decay: f64,
    /// Outcomes remembered per ensemble member.
    pub outcome_window: usize,
    /// Observations between analysis passes.
    pub analysis_interval: u64,
    /// Longest cycle period searched for.
    pub max_cycle_period: usize,
    /// Consecutive losses that switch to uniform random play.
    pub chaos_threshold: u32,
    /// Consecutive losses that start mixing in random play.
    pub reduced_trust_threshold: u32,
    /// Share of random play while trust is reduced.
    pub reduced_trust_random_share: f64,
    /// Observations before confidence is no longer scaled down.
    pub confidence_ramp: u32,
    pub selection: SelectionMode,
    /// Strategies the bandit samples from.
    pub bandit_candidates: Vec<StrategyKey>,
    /// Mixed into every decision seed.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            window: 100,
            eta: 0.15,
            min_weight: 0.01,
            meta_score_decay: 0.95,
            outcome_window: 50,
            analysis_interval: 10,
            max_cycle_period: 8,
            chaos_threshold: 3,
            reduced_trust_threshold: 2,
            reduced_trust_random_share: 0.7,
            confidence_ramp: 10,
            selection: SelectionMode::Ensemble,
            bandit_candidates: default_bandit_candidates(),
            seed: 0,
        }
    }
}

/// The direct level of every base predictor.
pub fn default_bandit_candidates() -> Vec<StrategyKey> {
    ALL_PREDICTORS
        .iter()
        .map(|&p| StrategyKey::new(p, MetaLevel::Direct0))
        .collect()
}

impl EngineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::Config(msg));
        if self.window < 4 {
            return fail(format!("window must be at least 4, got {}", self.window));
        }
        if !(self.eta > 0.0 && self.eta.is_finite()) {
            return fail(format!("eta must be positive, got {}", self.eta));
        }
        if !(self.min_weight > 0.0 && self.min_weight < 1.0) {
            return fail(format!("min_weight must be in (0, 1), got {}", self.min_weight));
        }
        if !(self.meta_score_decay > 0.0 && self.meta_score_decay <= 1.0) {
            return fail(format!(
                "meta_score_decay must be in (0, 1], got {}",
                self.meta_score_decay
            ));
        }
        if self.outcome_window == 0 {
            return fail("outcome_window must be positive".to_string());
        }
        if self.analysis_interval == 0 {
            return fail("analysis_interval must be positive".to_string());
        }
        if self.max_cycle_period == 0 {
            return fail("max_cycle_period must be positive".to_string());
        }
        if self.reduced_trust_threshold == 0 || self.reduced_trust_threshold >= self.chaos_threshold {
            return fail(format!(
                "thresholds out of order: need 0 < reduced_trust ({}) < chaos ({})",
                self.reduced_trust_threshold, self.chaos_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.reduced_trust_random_share) {
            return fail(format!(
                "reduced_trust_random_share must be in [0, 1], got {}",
                self.reduced_trust_random_share
            ));
        }
        if self.confidence_ramp == 0 {
            return fail("confidence_ramp must be positive".to_string());
        }
        if self.selection == SelectionMode::Bandit && self.bandit_candidates.is_empty() {
            return fail("bandit selection needs at least one candidate".to_string());
        }
        Ok(())
    }
}

/// Reads, parses and validates a JSON config file.
pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let data = fs::read_to_string(path)?;
    EngineConfig::from_json_str(&data)
}
