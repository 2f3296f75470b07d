//! Hedge-weighted ensemble.
//!
//! Members are registered up front and each keeps one persistent weight.
//! After every round a member that made a suggestion pays
//! `w *= exp(-eta * loss)`, where the loss is 0 if the suggestion would have
//! won, 0.5 for a tie and 1 for a loss. Weights are then renormalized so
//! they sum to the member count with none below the floor.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;

use log::trace;
use serde::Serialize;

use crate::game::{Blend, Distribution, Move, Outcome};

/// Learning rate.
pub const DEFAULT_ETA: f64 = 0.15;
/// Weight floor; keeps a silenced member able to recover.
pub const DEFAULT_MIN_WEIGHT: f64 = 0.01;
/// Outcomes remembered per member.
pub const DEFAULT_OUTCOME_WINDOW: usize = 50;

/// Weight and recent track record of one member.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRecord {
    weight: f64,
    outcomes: VecDeque<Outcome>,
    capacity: usize,
}

impl StrategyRecord {
    pub fn new(capacity: usize) -> Self {
        StrategyRecord {
            weight: 1.0,
            outcomes: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn push(&mut self, outcome: Outcome) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }

    /// Share of remembered rounds the member's suggestion would have won.
    pub fn win_rate(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let wins = self.outcomes.iter().filter(|o| **o == Outcome::Win).count();
        Some(wins as f64 / self.outcomes.len() as f64)
    }
}

/// Serializable view of one member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberSnapshot<K> {
    pub member: K,
    pub weight: f64,
    pub win_rate: Option<f64>,
    pub rounds: usize,
}

/// Multiplicative-weights ensemble keyed by `K`.
#[derive(Debug, Clone)]
pub struct WeightedEnsemble<K: Ord> {
    eta: f64,
    min_weight: f64,
    members: BTreeMap<K, StrategyRecord>,
}

impl<K: Ord + Copy + Debug> WeightedEnsemble<K> {
    pub fn new(
        members: impl IntoIterator<Item = K>,
        eta: f64,
        min_weight: f64,
        outcome_window: usize,
    ) -> Self {
        WeightedEnsemble {
            eta,
            // Above 1 the floor and the sum cannot both hold.
            min_weight: min_weight.clamp(0.0, 1.0),
            members: members
                .into_iter()
                .map(|k| (k, StrategyRecord::new(outcome_window)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    /// Current weight of a member, `None` if it is not registered.
    pub fn weight(&self, member: K) -> Option<f64> {
        self.members.get(&member).map(|r| r.weight)
    }

    pub fn record(&self, member: K) -> Option<&StrategyRecord> {
        self.members.get(&member)
    }

    /// Weight-normalized blend of the members that predicted this turn.
    /// Unregistered members are ignored. `None` when nobody predicted.
    pub fn combine<'a, I>(&self, predictions: I) -> Option<Distribution>
    where
        I: IntoIterator<Item = (K, &'a Distribution)>,
    {
        let mut blend = Blend::new();
        for (member, dist) in predictions {
            if let Some(weight) = self.weight(member) {
                blend.add(dist, weight);
            }
        }
        blend.finish()
    }

    /// Charges every member that made a suggestion for the round just played.
    /// Members that abstained keep their weight.
    pub fn update<I>(&mut self, suggestions: I, actual: Move)
    where
        I: IntoIterator<Item = (K, Move)>,
    {
        let mut touched = false;
        for (member, suggestion) in suggestions {
            let Some(record) = self.members.get_mut(&member) else {
                trace!("ignoring unregistered ensemble member {member:?}");
                continue;
            };
            let outcome = Outcome::of(suggestion, actual);
            record.weight *= (-self.eta * outcome.hedge_loss()).exp();
            record.weight = record.weight.max(self.min_weight);
            record.push(outcome);
            touched = true;
        }
        if touched {
            self.renormalize();
        }
    }

    /// Scales weights to sum to the member count. Members the scaling would
    /// push under the floor are pinned to it and the others share the rest.
    fn renormalize(&mut self) {
        let n = self.members.len();
        let total: f64 = self.members.values().map(|r| r.weight).sum();
        if total <= 0.0 || !total.is_finite() {
            self.reset_weights();
            return;
        }
        let floor = self.min_weight;
        let mut pinned = vec![false; n];
        loop {
            let pinned_count = pinned.iter().filter(|&&p| p).count();
            let free_total: f64 = self
                .members
                .values()
                .zip(&pinned)
                .filter(|&(_, &p)| !p)
                .map(|(r, _)| r.weight)
                .sum();
            let target = n as f64 - pinned_count as f64 * floor;
            if free_total <= 0.0 || target <= 0.0 {
                self.reset_weights();
                return;
            }
            let scale = target / free_total;
            let mut pinned_more = false;
            for (record, p) in self.members.values().zip(pinned.iter_mut()) {
                if !*p && record.weight * scale < floor {
                    *p = true;
                    pinned_more = true;
                }
            }
            if !pinned_more {
                for (record, &p) in self.members.values_mut().zip(&pinned) {
                    record.weight = if p { floor } else { record.weight * scale };
                }
                return;
            }
        }
    }

    fn reset_weights(&mut self) {
        for record in self.members.values_mut() {
            record.weight = 1.0;
        }
    }

    pub fn snapshot(&self) -> Vec<MemberSnapshot<K>> {
        self.members
            .iter()
            .map(|(&member, record)| MemberSnapshot {
                member,
                weight: record.weight,
                win_rate: record.win_rate(),
                rounds: record.outcomes.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Move::*;

    fn ensemble() -> WeightedEnsemble<u8> {
        WeightedEnsemble::new([0u8, 1, 2], DEFAULT_ETA, DEFAULT_MIN_WEIGHT, 4)
    }

    fn total(e: &WeightedEnsemble<u8>) -> f64 {
        (0u8..3).map(|k| e.weight(k).unwrap()).sum()
    }

    #[test]
    fn winners_gain_weight_losers_lose_it() {
        let mut e = ensemble();
        // Opponent plays Rock: member 0 suggested Paper (win), 1 Scissors (loss).
        e.update([(0, Paper), (1, Scissors)], Rock);
        assert!(e.weight(0).unwrap() > e.weight(2).unwrap());
        assert!(e.weight(2).unwrap() > e.weight(1).unwrap());
        assert!((total(&e) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn tie_costs_half_a_loss() {
        let mut e = ensemble();
        e.update([(0, Rock), (1, Scissors)], Rock);
        let tie = e.weight(0).unwrap();
        let loss = e.weight(1).unwrap();
        let idle = e.weight(2).unwrap();
        assert!(idle > tie && tie > loss);
        let ratio = (idle / tie).ln();
        assert!((ratio - DEFAULT_ETA * 0.5).abs() < 1e-9);
    }

    #[test]
    fn floor_keeps_members_alive() {
        let mut e = WeightedEnsemble::new([0u8, 1], 5.0, 0.05, 10);
        for _ in 0..50 {
            e.update([(0, Scissors), (1, Paper)], Rock);
        }
        assert!(e.weight(0).unwrap() > 0.0);
        assert!(e.weight(0).unwrap() < e.weight(1).unwrap());
        let sum = e.weight(0).unwrap() + e.weight(1).unwrap();
        assert!((sum - 2.0).abs() < 1e-9);
    }

    #[test]
    fn renormalizing_never_drops_below_the_floor() {
        let mut e = WeightedEnsemble::new([0u8, 1, 2, 3], 3.0, 0.3, 10);
        for round in 0..200 {
            // Member 0 always wins, 1 always loses, 2 and 3 take turns.
            let (two, three) = if round % 2 == 0 { (Paper, Scissors) } else { (Scissors, Paper) };
            e.update([(0, Paper), (1, Scissors), (2, two), (3, three)], Rock);
            let weights: Vec<f64> = (0u8..4).map(|k| e.weight(k).unwrap()).collect();
            assert!(weights.iter().all(|&w| w >= 0.3 - 1e-12), "round {round}: {weights:?}");
            let sum: f64 = weights.iter().sum();
            assert!((sum - 4.0).abs() < 1e-9, "round {round}: sum {sum}");
        }
        assert!(e.weight(1).unwrap() < 0.31);
        assert!(e.weight(0).unwrap() > e.weight(2).unwrap());
    }

    #[test]
    fn oversized_floor_is_capped() {
        let mut e = WeightedEnsemble::new([0u8, 1, 2], DEFAULT_ETA, 1.5, 4);
        assert_eq!(e.min_weight(), 1.0);
        e.update([(0, Paper), (1, Scissors)], Rock);
        for k in 0u8..3 {
            assert!((e.weight(k).unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn combine_is_weighted_and_skips_unknown() {
        let mut e = ensemble();
        for _ in 0..10 {
            e.update([(0, Paper), (1, Scissors)], Rock);
        }
        let rock = Distribution::one_hot(Rock);
        let paper = Distribution::one_hot(Paper);
        let blended = e.combine([(0, &rock), (1, &paper), (9, &paper)]).unwrap();
        assert!(blended.prob(Rock) > 0.6);
        assert!(blended.is_valid());
        assert!(e.combine(std::iter::empty::<(u8, &Distribution)>()).is_none());
    }

    #[test]
    fn outcome_window_is_bounded() {
        let mut e = ensemble();
        for _ in 0..3 {
            e.update([(0, Scissors)], Rock);
        }
        for _ in 0..4 {
            e.update([(0, Paper)], Rock);
        }
        let record = e.record(0).unwrap();
        assert_eq!(record.outcomes().count(), 4);
        assert_eq!(record.win_rate(), Some(1.0));
        assert_eq!(e.record(2).unwrap().win_rate(), None);
    }
}
