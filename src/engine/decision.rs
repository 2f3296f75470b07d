//! Decision output types.

use std::fmt;

use serde::Serialize;

use crate::game::{Distribution, Move};
use crate::predict::StrategyKey;

/// Why an action was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reasoning {
    /// No predictor was ready; played uniformly at random.
    InsufficientData,
    /// Losing streak reached the chaos threshold; played uniformly at random.
    Chaos { consecutive_losses: u32 },
    /// Losing streak reached the reduced-trust threshold. `strategy` is set
    /// when the statistical recommendation was kept.
    ReducedTrust {
        consecutive_losses: u32,
        strategy: Option<StrategyKey>,
    },
    /// Hedge blend; `dominant` contributed most to the chosen counter.
    Ensemble { dominant: StrategyKey },
    /// Thompson sampling picked `strategy`.
    Bandit { strategy: StrategyKey, sample: f64 },
}

impl Reasoning {
    pub fn strategy(&self) -> Option<StrategyKey> {
        match *self {
            Reasoning::InsufficientData | Reasoning::Chaos { .. } => None,
            Reasoning::ReducedTrust { strategy, .. } => strategy,
            Reasoning::Ensemble { dominant } => Some(dominant),
            Reasoning::Bandit { strategy, .. } => Some(strategy),
        }
    }

    /// True when the action was drawn at random rather than predicted.
    pub fn is_random(&self) -> bool {
        self.strategy().is_none()
    }
}

impl fmt::Display for Reasoning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reasoning::InsufficientData => f.write_str("insufficient data"),
            Reasoning::Chaos { consecutive_losses } => {
                write!(f, "chaos after {consecutive_losses} losses")
            }
            Reasoning::ReducedTrust {
                consecutive_losses,
                strategy: Some(key),
            } => write!(f, "reduced trust after {consecutive_losses} losses, kept {key}"),
            Reasoning::ReducedTrust {
                consecutive_losses,
                strategy: None,
            } => write!(f, "reduced trust after {consecutive_losses} losses, random"),
            Reasoning::Ensemble { dominant } => write!(f, "ensemble led by {dominant}"),
            Reasoning::Bandit { strategy, sample } => {
                write!(f, "bandit picked {strategy} (draw {sample:.3})")
            }
        }
    }
}

/// Score snapshot of one meta-strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyScore {
    pub key: StrategyKey,
    pub score: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Hedge weight of the strategy's base predictor.
    pub weight: f64,
    pub ready: bool,
}

/// Supporting detail attached to every decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub strategy: Option<StrategyKey>,
    /// Strongest pattern from the latest analysis pass.
    pub pattern: Option<String>,
    /// Blended (or selected) opponent distribution behind the choice.
    pub distribution: Option<Distribution>,
    pub expected_value: Option<f64>,
    pub scores: Vec<StrategyScore>,
}

/// The engine's answer for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: Move,
    /// In [0, 1]; 0 for random play.
    pub confidence: f64,
    pub reasoning: Reasoning,
    pub diagnostics: Diagnostics,
}
