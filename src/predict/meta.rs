//! Meta-strategy expansion ("Iocaine" levels).
//!
//! Every base predictor is expanded into six meta-strategies. The direct
//! levels assume the opponent is as naive as the prediction (`Direct0`) or is
//! itself one or two steps ahead of us (`Direct1`, `Direct2`). The mirrored
//! levels run the predictor on our own history and assume the opponent
//! counters what we are predictably about to do.
//!
//! Each level is a rotation of the base distribution: the implied
//! distribution over the opponent's next move, whose best response is the
//! level's suggestion.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::base::{Predictor, ALL_PREDICTORS};
use crate::game::{Distribution, Move};

/// One rung of the second-guessing ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaLevel {
    /// P.0: counter the predicted move.
    Direct0,
    /// P.1: the opponent anticipates P.0.
    Direct1,
    /// P.2: the opponent anticipates P.1.
    Direct2,
    /// P'.0: the opponent counters our predicted move; counter that.
    Mirror0,
    Mirror1,
    Mirror2,
}

pub const ALL_LEVELS: [MetaLevel; 6] = [
    MetaLevel::Direct0,
    MetaLevel::Direct1,
    MetaLevel::Direct2,
    MetaLevel::Mirror0,
    MetaLevel::Mirror1,
    MetaLevel::Mirror2,
];

impl MetaLevel {
    /// True for the levels that read our own history.
    pub const fn is_mirror(self) -> bool {
        matches!(
            self,
            MetaLevel::Mirror0 | MetaLevel::Mirror1 | MetaLevel::Mirror2
        )
    }

    pub const fn depth(self) -> usize {
        match self {
            MetaLevel::Direct0 | MetaLevel::Mirror0 => 0,
            MetaLevel::Direct1 | MetaLevel::Mirror1 => 1,
            MetaLevel::Direct2 | MetaLevel::Mirror2 => 2,
        }
    }

    /// How many times `counter` is applied to the base prediction to get the
    /// suggestion: 1, 3, 5 for the direct levels and 2, 4, 6 mirrored.
    const fn counter_steps(self) -> usize {
        let base = if self.is_mirror() { 2 } else { 1 };
        base + 2 * self.depth()
    }

    /// Our suggested move given the base point prediction.
    pub fn suggest(self, predicted: Move) -> Move {
        Move::from_index(predicted.index() + self.counter_steps())
    }

    /// Opponent distribution implied by this level: the suggestion beats the
    /// implied move, so mass shifts one step less than the suggestion does.
    pub fn implied(self, base: &Distribution) -> Distribution {
        base.rotate((self.counter_steps() - 1) % 3)
    }

    pub const fn label(self) -> &'static str {
        match self {
            MetaLevel::Direct0 => "direct0",
            MetaLevel::Direct1 => "direct1",
            MetaLevel::Direct2 => "direct2",
            MetaLevel::Mirror0 => "mirror0",
            MetaLevel::Mirror1 => "mirror1",
            MetaLevel::Mirror2 => "mirror2",
        }
    }
}

impl fmt::Display for MetaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one concrete meta-strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyKey {
    pub predictor: Predictor,
    pub level: MetaLevel,
}

impl StrategyKey {
    pub const fn new(predictor: Predictor, level: MetaLevel) -> Self {
        StrategyKey { predictor, level }
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.predictor, self.level)
    }
}

/// Every key in the strategy space, predictor-major.
pub fn all_strategy_keys() -> Vec<StrategyKey> {
    ALL_PREDICTORS
        .iter()
        .flat_map(|&p| ALL_LEVELS.iter().map(move |&l| StrategyKey::new(p, l)))
        .collect()
}

/// What one meta-strategy says for the coming turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetaPrediction {
    pub key: StrategyKey,
    /// Our move according to this strategy.
    pub suggestion: Move,
    /// Implied distribution over the opponent's move.
    pub implied: Distribution,
}

/// Expands one predictor's outputs into its meta-strategies.
///
/// `theirs` is the predictor run on the opponent's history, `ours` on our
/// own. Levels whose input abstained are omitted.
pub fn expand(
    predictor: Predictor,
    theirs: Option<&Distribution>,
    ours: Option<&Distribution>,
) -> Vec<MetaPrediction> {
    let mut out = Vec::with_capacity(ALL_LEVELS.len());
    for level in ALL_LEVELS {
        let base = if level.is_mirror() { ours } else { theirs };
        let Some(base) = base else { continue };
        out.push(MetaPrediction {
            key: StrategyKey::new(predictor, level),
            suggestion: level.suggest(base.argmax()),
            implied: level.implied(base),
        });
    }
    out
}
