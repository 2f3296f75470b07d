//! Base predictors.
//!
//! Each predictor is a pure function of a move history (plus the pattern
//! table maintained for that history) and either abstains or returns a
//! distribution over the next move of whoever produced the history. They are
//! applied to the opponent's history for the direct meta levels and to our
//! own history for the mirrored ones.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{Distribution, Move, WeaponStats, ALL_MOVES};
use crate::store::TransitionTable;

/// Samples needed before the frequency predictor speaks.
pub const FREQUENCY_MIN_SAMPLES: usize = 3;
/// History length needed before history matching is attempted.
pub const HISTORY_MATCH_MIN_SAMPLES: usize = 5;
pub const HISTORY_MATCH_MIN_LEN: usize = 2;
pub const HISTORY_MATCH_MAX_LEN: usize = 10;
/// Observations of the current context needed by the Markov predictors.
pub const MARKOV_MIN_STATE_COUNT: u32 = 3;

const ATTACK_SHARE_WEIGHT: f64 = 0.7;
const DEFENSE_SHARE_WEIGHT: f64 = 0.2;
const BALANCE_SHARE_WEIGHT: f64 = 0.1;

/// The closed set of base predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predictor {
    Frequency,
    HistoryMatch,
    Markov1,
    Markov2,
    Markov3,
    WeaponStats,
}

pub const ALL_PREDICTORS: [Predictor; 6] = [
    Predictor::Frequency,
    Predictor::HistoryMatch,
    Predictor::Markov1,
    Predictor::Markov2,
    Predictor::Markov3,
    Predictor::WeaponStats,
];

impl Predictor {
    pub const fn name(self) -> &'static str {
        match self {
            Predictor::Frequency => "frequency",
            Predictor::HistoryMatch => "history_match",
            Predictor::Markov1 => "markov1",
            Predictor::Markov2 => "markov2",
            Predictor::Markov3 => "markov3",
            Predictor::WeaponStats => "weapon_stats",
        }
    }

    pub const fn markov_order(self) -> Option<usize> {
        match self {
            Predictor::Markov1 => Some(1),
            Predictor::Markov2 => Some(2),
            Predictor::Markov3 => Some(3),
            _ => None,
        }
    }

    /// Runs the predictor over `history`.
    ///
    /// `patterns` must be the transition table of `history`; `weapon` is the
    /// stat-derived distribution for the turn, if one was supplied. Only the
    /// weapon predictor reads it.
    pub fn predict(
        self,
        history: &[Move],
        patterns: &TransitionTable,
        weapon: Option<&Distribution>,
    ) -> Option<Distribution> {
        match self {
            Predictor::Frequency => frequency(history),
            Predictor::HistoryMatch => history_match(history).map(Distribution::one_hot),
            Predictor::Markov1 | Predictor::Markov2 | Predictor::Markov3 => {
                let order = self.markov_order()?;
                markov(patterns, history, order)
            }
            Predictor::WeaponStats => weapon.copied(),
        }
    }
}

impl fmt::Display for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Empirical move distribution. Its argmax is the most-played move.
pub fn frequency(history: &[Move]) -> Option<Distribution> {
    if history.len() < FREQUENCY_MIN_SAMPLES {
        return None;
    }
    Distribution::of_moves(history)
}

/// Finds the longest suffix (2..=10 moves) that also occurs earlier and
/// returns the move that followed its earliest occurrence.
pub fn history_match(history: &[Move]) -> Option<Move> {
    let n = history.len();
    if n < HISTORY_MATCH_MIN_SAMPLES {
        return None;
    }
    let longest = HISTORY_MATCH_MAX_LEN.min(n - 1);
    for len in (HISTORY_MATCH_MIN_LEN..=longest).rev() {
        let suffix = &history[n - len..];
        // The occurrence must end before the last move so a successor exists.
        for start in 0..n - len {
            if &history[start..start + len] == suffix {
                return Some(history[start + len]);
            }
        }
    }
    None
}

/// Transition distribution out of the current order-`order` context.
pub fn markov(patterns: &TransitionTable, history: &[Move], order: usize) -> Option<Distribution> {
    let counts = patterns.current(history, order)?;
    if counts.total < MARKOV_MIN_STATE_COUNT {
        return None;
    }
    Distribution::from_counts(counts.counts)
}

/// Distribution over the opponent's likely action from its weapon stats,
/// with a confidence that grows with how lopsided the stats are.
///
/// Mixes attack share, defense share and balance share (the smaller of the
/// two per weapon). Abstains when every attack value is zero.
pub fn weapon_stats(stats: &WeaponStats) -> Option<(Distribution, f64)> {
    let attack = Distribution::from_weights(stats.attacks())?;
    let defense = Distribution::from_weights(stats.defenses()).unwrap_or_else(Distribution::uniform);
    let balance = Distribution::from_weights(
        ALL_MOVES.map(|m| attack.prob(m).min(defense.prob(m))),
    )
    .unwrap_or_else(Distribution::uniform);

    let mixed = Distribution::from_weights(ALL_MOVES.map(|m| {
        ATTACK_SHARE_WEIGHT * attack.prob(m)
            + DEFENSE_SHARE_WEIGHT * defense.prob(m)
            + BALANCE_SHARE_WEIGHT * balance.prob(m)
    }))?;
    Some((mixed, mixed.skew()))
}

/// The [`weapon_stats`] distribution pulled toward uniform by one minus its
/// confidence. Near-even stats then barely move a blend.
pub fn weapon_prediction(stats: &WeaponStats) -> Option<Distribution> {
    let (dist, confidence) = weapon_stats(stats)?;
    Distribution::from_weights(ALL_MOVES.map(|m| confidence * dist.prob(m) + (1.0 - confidence) / 3.0))
}
