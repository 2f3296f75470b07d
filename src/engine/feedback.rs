//! Learning from observed rounds.
//!
//! Scoring uses the predictions that were available before the round, so
//! every strategy is judged only on information it could have had. The
//! order within one observation is fixed: predict from the old state, pick
//! the ensemble members with the old meta scores, score every strategy,
//! update the Hedge weights, append the round, update the losing streak and
//! finally run the periodic analysis.

use log::{debug, info, warn};

use super::Engine;
use crate::analysis::{analyze, Behavior};
use crate::error::EngineError;
use crate::game::{Move, Outcome};
use crate::predict::{all_strategy_keys, PredictionSet};
use crate::store::{lock_record, OpponentRecord};

impl Engine {
    /// Records a completed round against `opponent` and returns its outcome
    /// from our side.
    ///
    /// Turn numbers must strictly increase per opponent; a stale or repeated
    /// turn fails with `OutOfOrder` and leaves the record untouched.
    pub fn observe(
        &self,
        opponent: &str,
        turn: u32,
        ours: Move,
        theirs: Move,
    ) -> Result<Outcome, EngineError> {
        let handle = self.store.handle(opponent)?;
        let mut record = lock_record(&handle)?;
        record.check_invariants()?;
        if let Err(e) = record.check_turn(opponent, turn) {
            warn!("rejected observation: {e}");
            return Err(e);
        }

        let weapon = record.take_pending(turn);
        let predictions = PredictionSet::compute(&record.prediction_input(weapon.as_ref()));
        let members = predictions.ensemble_members(|key| record.score(key));

        let mut ensemble = self.lock_ensemble()?;
        let decay = self.config.meta_score_decay;
        for key in all_strategy_keys() {
            match predictions.get(key) {
                Some(meta) => {
                    record.strategy_mut(key).record(meta.suggestion, theirs, decay);
                }
                None => record.clear_last_prediction(key),
            }
        }
        ensemble.update(members.iter().map(|m| (m.key.predictor, m.suggestion)), theirs);
        drop(ensemble);

        record.push_round(turn, ours, theirs);
        let outcome = Outcome::of(ours, theirs);
        record.register_outcome(outcome);

        if record.observations() % self.config.analysis_interval == 0 {
            self.run_analysis(opponent, &mut record);
        }

        debug!(
            "'{opponent}' turn {turn}: {ours} vs {theirs} -> {outcome:?} ({} strategies scored, streak {})",
            predictions.len(),
            record.consecutive_losses()
        );
        Ok(outcome)
    }

    /// [`Engine::observe`] with move names as the game service sends them
    /// (`rock`, `paper`, `scissor`). Unknown names fail before anything is
    /// recorded.
    pub fn observe_named(
        &self,
        opponent: &str,
        turn: u32,
        ours: &str,
        theirs: &str,
    ) -> Result<Outcome, EngineError> {
        let ours: Move = ours.parse()?;
        let theirs: Move = theirs.parse()?;
        self.observe(opponent, turn, ours, theirs)
    }

    fn run_analysis(&self, opponent: &str, record: &mut OpponentRecord) {
        let previous_cycle = record.detected_cycle_length();
        let previous_class = record.analysis().map(|a| a.profile.classification);
        let previous_adaptation = record
            .analysis()
            .and_then(|a| a.adaptation.as_ref())
            .map(|a| a.adaptation_type);
        let report = analyze(
            record.our_history(),
            record.their_history(),
            self.config.max_cycle_period,
            record.observations(),
        );
        if report.cycle_length.is_some() && report.cycle_length != previous_cycle {
            info!(
                "'{opponent}': cycle of length {} detected",
                report.cycle_length.unwrap_or_default()
            );
        }
        let class = report.profile.classification;
        if class != Behavior::Stable && Some(class) != previous_class {
            info!("'{opponent}': behaviour profile {}", report.profile);
        }
        let adaptation = report.adaptation.as_ref().map(|a| a.adaptation_type);
        if let Some(kind) = adaptation.filter(|_| adaptation != previous_adaptation) {
            debug!("'{opponent}': adaptation {kind}");
        }
        record.set_analysis(report);
        if let Some(entropy) = record.entropy() {
            debug!(
                "'{opponent}': window entropy {:.3} ({:?}) at {} observations",
                entropy.value, entropy.class, entropy.computed_at
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::AdaptationType;
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::error::EngineError;
    use crate::game::{Move, MoveSet, Outcome};
    use crate::predict::{MetaLevel, Predictor, StrategyKey};
    use Move::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn observe_returns_outcome() {
        let engine = engine();
        assert_eq!(engine.observe("orc", 1, Paper, Rock).unwrap(), Outcome::Win);
        assert_eq!(engine.observe("orc", 2, Rock, Paper).unwrap(), Outcome::Loss);
        assert_eq!(engine.observe("orc", 3, Rock, Rock).unwrap(), Outcome::Tie);
    }

    #[test]
    fn stale_turn_mutates_nothing() {
        let engine = engine();
        engine.observe("orc", 4, Paper, Rock).unwrap();
        let before = engine.summary("orc").unwrap().unwrap();
        let err = engine.observe("orc", 4, Rock, Paper).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrder { last: 4, got: 4, .. }));
        assert!(engine.observe("orc", 2, Rock, Paper).is_err());
        assert_eq!(engine.summary("orc").unwrap().unwrap(), before);
        let err = engine.choose_action("orc", 3, MoveSet::ALL, None).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrder { .. }));
    }

    #[test]
    fn bad_move_name_mutates_nothing() {
        let engine = engine();
        engine.observe_named("orc", 1, "rock", "scissor").unwrap();
        let err = engine.observe_named("orc", 2, "rock", "lizard").unwrap_err();
        assert!(matches!(err, EngineError::InvalidObservation(_)));
        let summary = engine.summary("orc").unwrap().unwrap();
        assert_eq!(summary.observations, 1);
        assert_eq!(summary.last_turn, Some(1));
    }

    #[test]
    fn strategies_are_scored_on_prior_predictions() {
        let engine = engine();
        for turn in 1..=3 {
            engine.observe("orc", turn, Rock, Scissors).unwrap();
        }
        let record = engine.record_snapshot("orc").unwrap().unwrap();
        // Frequency first spoke after three samples, so nothing is scored yet.
        let key = StrategyKey::new(Predictor::Frequency, MetaLevel::Direct0);
        assert!(record.strategy(key).is_none());

        engine.observe("orc", 4, Rock, Scissors).unwrap();
        let record = engine.record_snapshot("orc").unwrap().unwrap();
        let entry = record.strategy(key).unwrap();
        assert_eq!(entry.score, 1.0);
        assert_eq!(entry.posterior.alpha, 2.0);
        assert_eq!(entry.last_prediction, Some(Rock));
        // Direct1 suggested Scissors against Scissors: a tie.
        let tie = record
            .strategy(StrategyKey::new(Predictor::Frequency, MetaLevel::Direct1))
            .unwrap();
        assert_eq!(tie.score, 0.0);
        assert_eq!(tie.posterior.beta, 2.0);
    }

    #[test]
    fn analysis_runs_on_interval() {
        let engine = engine();
        for turn in 1..=9 {
            engine.observe("orc", turn, Rock, Paper).unwrap();
        }
        assert!(engine.summary("orc").unwrap().unwrap().detected_cycle_length.is_none());
        engine.observe("orc", 10, Rock, Paper).unwrap();
        let summary = engine.summary("orc").unwrap().unwrap();
        assert_eq!(summary.detected_cycle_length, Some(1));
        assert!(summary.profile.is_some());
    }

    #[test]
    fn analysis_fills_entropy_and_adaptation() {
        let engine = engine();
        for turn in 1..=10 {
            engine.observe("orc", turn, Rock, Paper).unwrap();
        }
        let record = engine.record_snapshot("orc").unwrap().unwrap();
        let entropy = record.cached_entropy().unwrap();
        assert_eq!(entropy.value, 0.0);
        assert_eq!(entropy.computed_at, 10);
        let adaptation = record.analysis().unwrap().adaptation.as_ref().unwrap();
        assert_eq!(adaptation.adaptation_type, AdaptationType::Stable);
    }
}
