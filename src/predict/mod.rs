//! Opponent prediction.
//!
//! - `base`: the base predictors (frequency, history match, Markov chains of
//!   order 1-3, weapon stats).
//! - `meta`: expansion of every base prediction into six meta-strategies.
//! - `bandit`: Thompson sampling over meta-strategies.
//! - `ensemble`: Hedge-weighted blending of the base predictors.
//!
//! [`PredictionSet::compute`] runs everything for one opponent at one point in
//! time. It only reads state, so the same set is used to decide a turn and,
//! later, to score the strategies once the opponent's move is known.

pub mod bandit;
pub mod base;
pub mod ensemble;
pub mod meta;

pub use bandit::{BanditPick, BanditSelector, Posterior};
pub use base::{Predictor, ALL_PREDICTORS};
pub use ensemble::{MemberSnapshot, StrategyRecord, WeightedEnsemble};
pub use meta::{all_strategy_keys, MetaLevel, MetaPrediction, StrategyKey, ALL_LEVELS};

use crate::game::{Distribution, Move};
use crate::store::TransitionTable;

/// Everything the predictors read for one opponent.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub theirs: &'a [Move],
    pub ours: &'a [Move],
    pub their_patterns: &'a TransitionTable,
    pub our_patterns: &'a TransitionTable,
    /// Stat-derived distribution for the current turn, if stats were supplied.
    pub weapon: Option<&'a Distribution>,
}

/// All meta-strategy predictions for one turn.
#[derive(Debug, Clone, Default)]
pub struct PredictionSet {
    metas: Vec<MetaPrediction>,
}

impl PredictionSet {
    pub fn compute(input: &PredictionInput<'_>) -> Self {
        let mut metas = Vec::with_capacity(36);
        for predictor in ALL_PREDICTORS {
            let theirs = predictor.predict(input.theirs, input.their_patterns, input.weapon);
            // No stat snapshot exists for our side.
            let ours = predictor.predict(input.ours, input.our_patterns, None);
            metas.extend(meta::expand(predictor, theirs.as_ref(), ours.as_ref()));
        }
        PredictionSet { metas }
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaPrediction> {
        self.metas.iter()
    }

    pub fn get(&self, key: StrategyKey) -> Option<&MetaPrediction> {
        self.metas.iter().find(|m| m.key == key)
    }

    /// The Iocaine choice for `predictor`: its ready meta level with the
    /// highest score, ties going to the earlier level.
    pub fn best_level<F>(&self, predictor: Predictor, mut score: F) -> Option<&MetaPrediction>
    where
        F: FnMut(StrategyKey) -> f64,
    {
        let mut best: Option<(&MetaPrediction, f64)> = None;
        for meta in self.metas.iter().filter(|m| m.key.predictor == predictor) {
            let s = score(meta.key);
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((meta, s));
            }
        }
        best.map(|(m, _)| m)
    }

    /// One member per predictor that has anything to say this turn.
    pub fn ensemble_members<F>(&self, mut score: F) -> Vec<MetaPrediction>
    where
        F: FnMut(StrategyKey) -> f64,
    {
        ALL_PREDICTORS
            .iter()
            .filter_map(|&p| self.best_level(p, &mut score).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Move::*;

    fn set_for(theirs: &[Move], ours: &[Move]) -> PredictionSet {
        let tp = TransitionTable::from_history(theirs, 3);
        let op = TransitionTable::from_history(ours, 3);
        PredictionSet::compute(&PredictionInput {
            theirs,
            ours,
            their_patterns: &tp,
            our_patterns: &op,
            weapon: None,
        })
    }

    #[test]
    fn empty_history_predicts_nothing() {
        assert!(set_for(&[], &[]).is_empty());
    }

    #[test]
    fn weapon_mirror_levels_always_abstain() {
        let h = [Rock; 8];
        let tp = TransitionTable::from_history(&h, 3);
        let weapon = Distribution::one_hot(Scissors);
        let set = PredictionSet::compute(&PredictionInput {
            theirs: &h,
            ours: &h,
            their_patterns: &tp,
            our_patterns: &tp,
            weapon: Some(&weapon),
        });
        let weapon_keys: Vec<_> = set
            .iter()
            .filter(|m| m.key.predictor == Predictor::WeaponStats)
            .map(|m| m.key.level)
            .collect();
        assert_eq!(
            weapon_keys,
            vec![MetaLevel::Direct0, MetaLevel::Direct1, MetaLevel::Direct2]
        );
        // Five history predictors on both sides plus three weapon levels.
        assert_eq!(set.len(), 33);
    }

    #[test]
    fn best_level_uses_score_then_order() {
        let set = set_for(&[Rock; 6], &[Paper; 6]);
        let first = set.best_level(Predictor::Frequency, |_| 0.0).unwrap();
        assert_eq!(first.key.level, MetaLevel::Direct0);
        let mirror = set
            .best_level(Predictor::Frequency, |k| {
                if k.level == MetaLevel::Mirror0 {
                    2.0
                } else {
                    1.0
                }
            })
            .unwrap();
        assert_eq!(mirror.key.level, MetaLevel::Mirror0);
        // We keep playing Paper; the opponent would answer Scissors.
        assert_eq!(mirror.suggestion, Rock);
    }

    #[test]
    fn members_cover_ready_predictors_only() {
        let set = set_for(&[Rock, Paper, Scissors], &[Rock, Rock, Rock]);
        let members = set.ensemble_members(|_| 0.0);
        let predictors: Vec<_> = members.iter().map(|m| m.key.predictor).collect();
        assert_eq!(predictors, vec![Predictor::Frequency]);
    }
}
