//! Turning predictions into one action.
//!
//! Order of precedence for a turn:
//! 1. no legal move: `NoLegalAction`;
//! 2. losing streak at the chaos threshold: uniform random over legal moves;
//! 3. statistical recommendation (ensemble or bandit, per config), or uniform
//!    random when no predictor is ready;
//! 4. at the reduced-trust threshold the recommendation is replaced by a
//!    random move with the configured probability.

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::decision::{Decision, Diagnostics, Reasoning, StrategyScore};
use super::Engine;
use crate::config::SelectionMode;
use crate::error::EngineError;
use crate::game::{Distribution, Move, MoveSet, WeaponStats};
use crate::predict::base::weapon_prediction;
use crate::predict::{all_strategy_keys, PredictionSet, Predictor, StrategyKey, WeightedEnsemble};
use crate::store::{lock_record, OpponentRecord};

/// A statistical pick before anti-exploitation rules are applied.
struct Recommendation {
    action: Move,
    strategy: StrategyKey,
    /// Confidence before the evidence ramp.
    confidence: f64,
    distribution: Distribution,
    expected_value: f64,
    reasoning: Reasoning,
}

impl Engine {
    /// Picks our action for `turn` against `opponent`.
    ///
    /// `available` are the moves with charge left. `stats` is the opponent's
    /// weapon stat snapshot for this turn, if known; it is used for this
    /// decision only. Calling again for the same turn without observing in
    /// between returns the same decision.
    pub fn choose_action(
        &self,
        opponent: &str,
        turn: u32,
        available: MoveSet,
        stats: Option<&WeaponStats>,
    ) -> Result<Decision, EngineError> {
        if available.is_empty() {
            warn!("'{opponent}' turn {turn}: no legal action");
            return Err(EngineError::NoLegalAction);
        }
        let handle = self.store.handle(opponent)?;
        let mut record = lock_record(&handle)?;
        record.check_invariants()?;
        if let Err(e) = record.check_turn(opponent, turn) {
            warn!("rejected decision request: {e}");
            return Err(e);
        }

        let weapon = stats.and_then(weapon_prediction);
        record.set_pending(turn, weapon);

        let mut rng = self.decision_rng(opponent, record.observations(), turn);
        let decision = self.decide(opponent, &record, available, weapon.as_ref(), &mut rng)?;
        debug!(
            "'{opponent}' turn {turn}: {} (confidence {:.2}, {})",
            decision.action, decision.confidence, decision.reasoning
        );
        Ok(decision)
    }

    fn decide(
        &self,
        opponent: &str,
        record: &OpponentRecord,
        available: MoveSet,
        weapon: Option<&Distribution>,
        rng: &mut SmallRng,
    ) -> Result<Decision, EngineError> {
        let losses = record.consecutive_losses();
        let predictions = PredictionSet::compute(&record.prediction_input(weapon));
        let ensemble = self.lock_ensemble()?;

        let mut diagnostics = Diagnostics {
            pattern: record.analysis().and_then(|a| a.pattern()),
            scores: score_snapshot(record, &predictions, &ensemble),
            ..Diagnostics::default()
        };

        if losses >= self.config.chaos_threshold {
            if losses == self.config.chaos_threshold {
                warn!("'{opponent}': {losses} straight losses, playing at random");
            }
            return random_decision(available, Reasoning::Chaos { consecutive_losses: losses }, diagnostics, rng);
        }

        let recommendation = match self.config.selection {
            SelectionMode::Ensemble => ensemble_recommendation(record, &predictions, &ensemble, available),
            SelectionMode::Bandit => self.bandit_recommendation(record, &predictions, available, rng),
        };
        drop(ensemble);

        let Some(rec) = recommendation else {
            return random_decision(available, Reasoning::InsufficientData, diagnostics, rng);
        };
        diagnostics.distribution = Some(rec.distribution);
        diagnostics.expected_value = Some(rec.expected_value);

        let confidence = rec.confidence.clamp(0.0, 1.0) * self.evidence(record.observations());

        if losses >= self.config.reduced_trust_threshold {
            let share = self.config.reduced_trust_random_share;
            if rng.gen::<f64>() < share {
                let reasoning = Reasoning::ReducedTrust {
                    consecutive_losses: losses,
                    strategy: None,
                };
                return random_decision(available, reasoning, diagnostics, rng);
            }
            diagnostics.strategy = Some(rec.strategy);
            return Ok(Decision {
                action: rec.action,
                confidence: confidence * (1.0 - share),
                reasoning: Reasoning::ReducedTrust {
                    consecutive_losses: losses,
                    strategy: Some(rec.strategy),
                },
                diagnostics,
            });
        }

        diagnostics.strategy = Some(rec.strategy);
        Ok(Decision {
            action: rec.action,
            confidence,
            reasoning: rec.reasoning,
            diagnostics,
        })
    }

    fn bandit_recommendation(
        &self,
        record: &OpponentRecord,
        predictions: &PredictionSet,
        available: MoveSet,
        rng: &mut SmallRng,
    ) -> Option<Recommendation> {
        let pick = self.bandit.select(
            |key| predictions.get(key).map(|_| record.posterior(key)),
            rng,
        )?;
        let meta = predictions.get(pick.key)?;
        let (action, expected_value) = meta.implied.best_response(available)?;
        Some(Recommendation {
            action,
            strategy: pick.key,
            confidence: pick.posterior_mean,
            distribution: meta.implied,
            expected_value,
            reasoning: Reasoning::Bandit {
                strategy: pick.key,
                sample: pick.sample,
            },
        })
    }
}

/// Best response to the Hedge blend of every predictor's best meta level.
fn ensemble_recommendation(
    record: &OpponentRecord,
    predictions: &PredictionSet,
    ensemble: &WeightedEnsemble<Predictor>,
    available: MoveSet,
) -> Option<Recommendation> {
    let members = predictions.ensemble_members(|key| record.score(key));
    let blended = ensemble.combine(members.iter().map(|m| (m.key.predictor, &m.implied)))?;
    let (action, expected_value) = blended.best_response(available)?;

    // The member putting the most weighted mass on the move we beat.
    let target = action.beaten();
    let mut dominant: Option<(StrategyKey, f64)> = None;
    for m in &members {
        let mass = ensemble.weight(m.key.predictor).unwrap_or(0.0) * m.implied.prob(target);
        if dominant.map_or(true, |(_, best)| mass > best) {
            dominant = Some((m.key, mass));
        }
    }
    let (strategy, _) = dominant?;

    Some(Recommendation {
        action,
        strategy,
        confidence: expected_value,
        distribution: blended,
        expected_value,
        reasoning: Reasoning::Ensemble { dominant: strategy },
    })
}

fn random_decision(
    available: MoveSet,
    reasoning: Reasoning,
    diagnostics: Diagnostics,
    rng: &mut SmallRng,
) -> Result<Decision, EngineError> {
    let moves = available.to_vec();
    let action = *moves.choose(rng).ok_or(EngineError::NoLegalAction)?;
    Ok(Decision {
        action,
        confidence: 0.0,
        reasoning,
        diagnostics,
    })
}

fn score_snapshot(
    record: &OpponentRecord,
    predictions: &PredictionSet,
    ensemble: &WeightedEnsemble<Predictor>,
) -> Vec<StrategyScore> {
    all_strategy_keys()
        .into_iter()
        .map(|key| {
            let posterior = record.posterior(key);
            StrategyScore {
                key,
                score: record.score(key),
                alpha: posterior.alpha,
                beta: posterior.beta,
                weight: ensemble.weight(key.predictor).unwrap_or(0.0),
                ready: predictions.get(key).is_some(),
            }
        })
        .collect()
}
