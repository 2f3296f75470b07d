//! Periodic opponent analysis.
//!
//! Runs every few observations over the opponent window: cycle detection,
//! strongest recurring sequences, a statistical behaviour profile and a
//! look at how the opponent's mix changes over time. The results feed
//! decision diagnostics and the opponent summary.

pub mod adaptation;
pub mod cycle;
pub mod profile;

pub use adaptation::{adaptation, AdaptationReport, AdaptationType};
pub use cycle::{detect_cycle, strongest_sequences, SequenceSummary};
pub use profile::{
    history_entropy, profile, Behavior, BehaviorProfile, EntropyClass, PostLossReaction, RateTest,
};

use serde::Serialize;

use crate::game::Move;

/// Result of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Observation count the report was computed at.
    pub observations: u64,
    pub cycle_length: Option<usize>,
    pub sequences: Vec<SequenceSummary>,
    pub profile: BehaviorProfile,
    /// `None` until the window holds enough moves.
    pub adaptation: Option<AdaptationReport>,
}

impl AnalysisReport {
    /// Describes the strongest finding, e.g. `cycle:3` or `biased:rock@0.80`.
    /// `None` when nothing stands out.
    pub fn pattern(&self) -> Option<String> {
        match self.profile.classification {
            Behavior::Stable => self.sequences.first().map(|s| {
                let moves: Vec<&str> = s.pattern.iter().map(|m| m.name()).collect();
                format!("sequence:{}*{}", moves.join("-"), s.count)
            }),
            _ => Some(self.profile.describe()),
        }
    }
}

/// Analyzes aligned histories (`ours[i]` and `theirs[i]` from the same round).
pub fn analyze(ours: &[Move], theirs: &[Move], max_period: usize, observations: u64) -> AnalysisReport {
    let cycle_length = detect_cycle(theirs, max_period);
    AnalysisReport {
        observations,
        cycle_length,
        sequences: strongest_sequences(theirs),
        profile: profile(ours, theirs, cycle_length),
        adaptation: adaptation(theirs),
    }
}
