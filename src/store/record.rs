//! Per-opponent learned state.

use std::collections::BTreeMap;

use serde::Serialize;

use super::patterns::{TransitionTable, MAX_PATTERN_ORDER};
use crate::analysis::{
    history_entropy, AdaptationReport, AnalysisReport, BehaviorProfile, EntropyClass, SequenceSummary,
};
use crate::error::EngineError;
use crate::game::{Distribution, Move, Outcome};
use crate::predict::{Posterior, PredictionInput, StrategyKey};

/// Learned performance of one meta-strategy against one opponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyEntry {
    /// Exponentially decayed sum of +1 / 0 / -1 rewards.
    pub score: f64,
    pub posterior: Posterior,
    /// What the strategy suggested for the most recent observed round.
    pub last_prediction: Option<Move>,
}

impl Default for StrategyEntry {
    fn default() -> Self {
        StrategyEntry {
            score: 0.0,
            posterior: Posterior::default(),
            last_prediction: None,
        }
    }
}

impl StrategyEntry {
    /// Scores a suggestion against the move the opponent actually played.
    pub fn record(&mut self, suggestion: Move, actual: Move, decay: f64) -> Outcome {
        let outcome = Outcome::of(suggestion, actual);
        self.score = self.score * decay + outcome.reward();
        match outcome {
            Outcome::Win => self.posterior.alpha += 1.0,
            Outcome::Loss | Outcome::Tie => self.posterior.beta += 1.0,
        }
        self.last_prediction = Some(suggestion);
        outcome
    }
}

/// Cached entropy of the opponent window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntropyCache {
    pub value: f64,
    pub class: EntropyClass,
    /// Observation count the value was computed at.
    pub computed_at: u64,
}

/// Stat-derived prediction remembered between deciding a turn and
/// observing it, so the weapon predictor can be scored.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingDecision {
    turn: u32,
    weapon: Option<Distribution>,
}

/// Everything learned about one opponent.
#[derive(Debug, Clone)]
pub struct OpponentRecord {
    window: usize,
    their_history: Vec<Move>,
    our_history: Vec<Move>,
    their_patterns: TransitionTable,
    our_patterns: TransitionTable,
    strategies: BTreeMap<StrategyKey, StrategyEntry>,
    detected_cycle_length: Option<usize>,
    entropy: Option<EntropyCache>,
    analysis: Option<AnalysisReport>,
    consecutive_losses: u32,
    observations: u64,
    last_turn: Option<u32>,
    pending: Option<PendingDecision>,
}

impl OpponentRecord {
    pub fn new(window: usize) -> Self {
        OpponentRecord {
            window: window.max(1),
            their_history: Vec::with_capacity(window + 1),
            our_history: Vec::with_capacity(window + 1),
            their_patterns: TransitionTable::new(MAX_PATTERN_ORDER),
            our_patterns: TransitionTable::new(MAX_PATTERN_ORDER),
            strategies: BTreeMap::new(),
            detected_cycle_length: None,
            entropy: None,
            analysis: None,
            consecutive_losses: 0,
            observations: 0,
            last_turn: None,
            pending: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn their_history(&self) -> &[Move] {
        &self.their_history
    }

    pub fn our_history(&self) -> &[Move] {
        &self.our_history
    }

    pub fn their_patterns(&self) -> &TransitionTable {
        &self.their_patterns
    }

    pub fn our_patterns(&self) -> &TransitionTable {
        &self.our_patterns
    }

    /// Rounds observed since the record was created, including evicted ones.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn last_turn(&self) -> Option<u32> {
        self.last_turn
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn detected_cycle_length(&self) -> Option<usize> {
        self.detected_cycle_length
    }

    pub fn analysis(&self) -> Option<&AnalysisReport> {
        self.analysis.as_ref()
    }

    pub fn strategy(&self, key: StrategyKey) -> Option<&StrategyEntry> {
        self.strategies.get(&key)
    }

    pub fn strategies(&self) -> impl Iterator<Item = (&StrategyKey, &StrategyEntry)> {
        self.strategies.iter()
    }

    pub fn strategy_mut(&mut self, key: StrategyKey) -> &mut StrategyEntry {
        self.strategies.entry(key).or_default()
    }

    /// Meta score of a strategy; zero until it has been scored.
    pub fn score(&self, key: StrategyKey) -> f64 {
        self.strategies.get(&key).map_or(0.0, |e| e.score)
    }

    pub fn posterior(&self, key: StrategyKey) -> Posterior {
        self.strategies.get(&key).map_or_else(Posterior::default, |e| e.posterior)
    }

    /// Marks a strategy as silent for the latest round.
    pub fn clear_last_prediction(&mut self, key: StrategyKey) {
        if let Some(entry) = self.strategies.get_mut(&key) {
            entry.last_prediction = None;
        }
    }

    /// Fails with `OutOfOrder` unless `turn` is newer than every observed turn.
    pub fn check_turn(&self, opponent: &str, turn: u32) -> Result<(), EngineError> {
        match self.last_turn {
            Some(last) if turn <= last => Err(EngineError::OutOfOrder {
                opponent: opponent.to_string(),
                last,
                got: turn,
            }),
            _ => Ok(()),
        }
    }

    /// Remembers the stat-derived prediction made for `turn`.
    pub fn set_pending(&mut self, turn: u32, weapon: Option<Distribution>) {
        self.pending = Some(PendingDecision { turn, weapon });
    }

    /// Takes the stat-derived prediction made for `turn`, if any. A pending
    /// prediction for any other turn is discarded.
    pub fn take_pending(&mut self, turn: u32) -> Option<Distribution> {
        self.pending
            .take()
            .filter(|p| p.turn == turn)
            .and_then(|p| p.weapon)
    }

    /// Read-only view for the predictors.
    pub fn prediction_input<'a>(&'a self, weapon: Option<&'a Distribution>) -> PredictionInput<'a> {
        PredictionInput {
            theirs: &self.their_history,
            ours: &self.our_history,
            their_patterns: &self.their_patterns,
            our_patterns: &self.our_patterns,
            weapon,
        }
    }

    /// Appends a round to both windows, evicting the oldest round once a
    /// window is full. Pattern tables follow incrementally.
    pub fn push_round(&mut self, turn: u32, ours: Move, theirs: Move) {
        push_bounded(&mut self.their_history, &mut self.their_patterns, theirs, self.window);
        push_bounded(&mut self.our_history, &mut self.our_patterns, ours, self.window);
        self.observations += 1;
        self.last_turn = Some(turn);
        self.entropy = None;
    }

    /// Updates the losing streak. Wins and ties both break it.
    pub fn register_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Loss => self.consecutive_losses += 1,
            Outcome::Win | Outcome::Tie => self.consecutive_losses = 0,
        }
    }

    pub fn set_analysis(&mut self, report: AnalysisReport) {
        self.detected_cycle_length = report.cycle_length;
        self.analysis = Some(report);
    }

    /// Entropy of the opponent window, recomputed only after new observations.
    pub fn entropy(&mut self) -> Option<EntropyCache> {
        if self.entropy.is_none() {
            self.entropy = history_entropy(&self.their_history).map(|value| EntropyCache {
                value,
                class: EntropyClass::classify(value),
                computed_at: self.observations,
            });
        }
        self.entropy
    }

    /// Entropy without touching the cache.
    pub fn cached_entropy(&self) -> Option<EntropyCache> {
        self.entropy
    }

    /// Checks the structural invariants, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        if self.their_history.len() != self.our_history.len() {
            return Err(EngineError::StateCorruption(format!(
                "history lengths differ: theirs {}, ours {}",
                self.their_history.len(),
                self.our_history.len()
            )));
        }
        if self.their_history.len() > self.window {
            return Err(EngineError::StateCorruption(format!(
                "history holds {} moves, window is {}",
                self.their_history.len(),
                self.window
            )));
        }
        if self.their_history.len() as u64 > self.observations {
            return Err(EngineError::StateCorruption(
                "history longer than observation count".to_string(),
            ));
        }
        for (key, entry) in &self.strategies {
            let post = entry.posterior;
            if !(post.alpha >= 1.0 && post.beta >= 1.0) || !entry.score.is_finite() {
                return Err(EngineError::StateCorruption(format!(
                    "strategy {key} has alpha {}, beta {}, score {}",
                    post.alpha, post.beta, entry.score
                )));
            }
        }
        Ok(())
    }

    /// Serializable snapshot of what has been learned.
    pub fn summary(&mut self, opponent: &str) -> OpponentSummary {
        let entropy = self.entropy();
        OpponentSummary {
            opponent: opponent.to_string(),
            observations: self.observations,
            history_len: self.their_history.len(),
            last_turn: self.last_turn,
            consecutive_losses: self.consecutive_losses,
            entropy,
            detected_cycle_length: self.detected_cycle_length,
            profile: self.analysis.as_ref().map(|a| a.profile.clone()),
            sequences: self
                .analysis
                .as_ref()
                .map(|a| a.sequences.clone())
                .unwrap_or_default(),
            pattern: self.analysis.as_ref().and_then(|a| a.pattern()),
            adaptation: self.analysis.as_ref().and_then(|a| a.adaptation.clone()),
        }
    }
}

fn push_bounded(history: &mut Vec<Move>, patterns: &mut TransitionTable, m: Move, window: usize) {
    patterns.record(history, m);
    history.push(m);
    if history.len() > window {
        patterns.evict_front(history);
        history.remove(0);
    }
}

/// What the engine knows about one opponent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentSummary {
    pub opponent: String,
    pub observations: u64,
    pub history_len: usize,
    pub last_turn: Option<u32>,
    pub consecutive_losses: u32,
    pub entropy: Option<EntropyCache>,
    pub detected_cycle_length: Option<usize>,
    pub profile: Option<BehaviorProfile>,
    pub sequences: Vec<SequenceSummary>,
    pub pattern: Option<String>,
    pub adaptation: Option<AdaptationReport>,
}
