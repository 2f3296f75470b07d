//! How an opponent's play changes over the window.
//!
//! The window is cut into consecutive periods of `max(10, n / 5)` moves and
//! into thirds. Comparing them shows whether the opponent drifts toward
//! uniform play, rotates its favourite move, settles into a pattern or keeps
//! shifting its mix.

use std::fmt;

use serde::Serialize;

use crate::game::{Distribution, Move, ALL_MOVES};

/// Moves needed before any adaptation is reported.
pub const MIN_ADAPTATION_SAMPLES: usize = 10;
pub const MIN_PERIOD_LEN: usize = 10;
/// Target number of periods on a long window.
pub const PERIODS: usize = 5;

/// Total deviation from 1/3 under which the latest period counts as uniform.
const NASH_DEVIATION: f64 = 0.1;
/// Normalized entropy change between first and last period (about 0.2 bits).
const ENTROPY_SHIFT: f64 = 0.125;
const PERIOD_SHIFT: f64 = 0.2;
const PHASE_SHIFT: f64 = 0.15;
const CYCLE_RATE: f64 = 0.4;
const HEAVY_SHARE: f64 = 0.45;
const AVOID_SHARE: f64 = 0.20;

/// Move mix of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub start: usize,
    pub len: usize,
    pub distribution: Distribution,
    pub entropy: f64,
    pub dominant: Move,
}

/// The largest change in a move's share between two consecutive periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyShift {
    /// Index of the later period.
    pub period: usize,
    pub action: Move,
    /// Signed change in share.
    pub delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    EarlyToMiddle,
    MiddleToLate,
}

/// A move whose share moved between thirds of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseShift {
    pub phase: Phase,
    pub action: Move,
    pub delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyTrend {
    Rising,
    Falling,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Heavy,
    Avoids,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveBias {
    pub action: Move,
    pub kind: BiasKind,
    pub share: f64,
}

/// Share of transitions that step around the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleRates {
    /// Next move beats the previous one.
    pub forward: f64,
    /// Next move loses to the previous one.
    pub reverse: f64,
}

impl CycleRates {
    pub fn forward_cycle(&self) -> bool {
        self.forward > CYCLE_RATE
    }

    pub fn reverse_cycle(&self) -> bool {
        self.reverse > CYCLE_RATE
    }
}

/// Overall verdict, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationType {
    NashConvergence,
    Cycling,
    AdaptiveRandomization,
    SettlingPattern,
    ActivelyAdapting,
    MinorAdjustment,
    Stable,
}

impl AdaptationType {
    pub const fn name(self) -> &'static str {
        match self {
            AdaptationType::NashConvergence => "nash_convergence",
            AdaptationType::Cycling => "cycling",
            AdaptationType::AdaptiveRandomization => "adaptive_randomization",
            AdaptationType::SettlingPattern => "settling_pattern",
            AdaptationType::ActivelyAdapting => "actively_adapting",
            AdaptationType::MinorAdjustment => "minor_adjustment",
            AdaptationType::Stable => "stable",
        }
    }
}

impl fmt::Display for AdaptationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationReport {
    pub samples: usize,
    pub periods: Vec<PeriodStats>,
    pub converging_to_nash: bool,
    pub entropy_trend: EntropyTrend,
    pub shifts: Vec<StrategyShift>,
    pub phase_shifts: Vec<PhaseShift>,
    /// The dominant move of each period tends to beat the previous one.
    pub dominant_cycling: bool,
    pub cycle_rates: CycleRates,
    pub biases: Vec<MoveBias>,
    pub adaptation_type: AdaptationType,
}

/// Analyzes how `history` (oldest first) changes over time.
/// `None` below [`MIN_ADAPTATION_SAMPLES`] moves.
pub fn adaptation(history: &[Move]) -> Option<AdaptationReport> {
    let n = history.len();
    if n < MIN_ADAPTATION_SAMPLES {
        return None;
    }
    let overall = Distribution::of_moves(history)?;

    let period_len = MIN_PERIOD_LEN.max(n / PERIODS);
    let periods: Vec<PeriodStats> = history
        .chunks(period_len)
        .enumerate()
        .filter_map(|(i, chunk)| {
            let distribution = Distribution::of_moves(chunk)?;
            Some(PeriodStats {
                start: i * period_len,
                len: chunk.len(),
                entropy: distribution.entropy(),
                dominant: distribution.argmax(),
                distribution,
            })
        })
        .collect();

    let converging_to_nash = periods.last().is_some_and(|p| {
        let deviation: f64 = p.distribution.as_array().iter().map(|x| (x - 1.0 / 3.0).abs()).sum();
        deviation < NASH_DEVIATION
    });

    let entropy_trend = match (periods.first(), periods.last()) {
        (Some(first), Some(last)) if periods.len() >= 3 => {
            if last.entropy > first.entropy + ENTROPY_SHIFT {
                EntropyTrend::Rising
            } else if last.entropy < first.entropy - ENTROPY_SHIFT {
                EntropyTrend::Falling
            } else {
                EntropyTrend::Steady
            }
        }
        _ => EntropyTrend::Steady,
    };

    let shifts: Vec<StrategyShift> = periods
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let (action, delta) = largest_change(&pair[0].distribution, &pair[1].distribution);
            (delta.abs() > PERIOD_SHIFT).then_some(StrategyShift {
                period: i + 1,
                action,
                delta,
            })
        })
        .collect();

    let dominant_cycling = periods.len() >= 3 && {
        let steps = periods
            .windows(2)
            .filter(|pair| pair[1].dominant == pair[0].dominant.counter())
            .count();
        steps as f64 >= periods.len() as f64 * 0.5
    };

    let phase_shifts = phase_shifts(history);
    let cycle_rates = cycle_rates(history);
    let biases = ALL_MOVES
        .into_iter()
        .filter_map(|action| {
            let share = overall.prob(action);
            let kind = if share > HEAVY_SHARE {
                BiasKind::Heavy
            } else if share < AVOID_SHARE {
                BiasKind::Avoids
            } else {
                return None;
            };
            Some(MoveBias { action, kind, share })
        })
        .collect();

    let signs = shifts.len() + phase_shifts.len();
    let adaptation_type = if converging_to_nash {
        AdaptationType::NashConvergence
    } else if dominant_cycling {
        AdaptationType::Cycling
    } else if entropy_trend == EntropyTrend::Rising {
        AdaptationType::AdaptiveRandomization
    } else if entropy_trend == EntropyTrend::Falling {
        AdaptationType::SettlingPattern
    } else if signs >= 2 {
        AdaptationType::ActivelyAdapting
    } else if signs == 1 {
        AdaptationType::MinorAdjustment
    } else {
        AdaptationType::Stable
    };

    Some(AdaptationReport {
        samples: n,
        periods,
        converging_to_nash,
        entropy_trend,
        shifts,
        phase_shifts,
        dominant_cycling,
        cycle_rates,
        biases,
        adaptation_type,
    })
}

/// Move whose share changed most from `before` to `after`, and the signed
/// change. Ties go to the earlier move.
fn largest_change(before: &Distribution, after: &Distribution) -> (Move, f64) {
    let mut best = (Move::Rock, after.prob(Move::Rock) - before.prob(Move::Rock));
    for m in ALL_MOVES {
        let delta = after.prob(m) - before.prob(m);
        if delta.abs() > best.1.abs() {
            best = (m, delta);
        }
    }
    best
}

fn phase_shifts(history: &[Move]) -> Vec<PhaseShift> {
    let third = history.len() / 3;
    let early = Distribution::of_moves(&history[..third]);
    let middle = Distribution::of_moves(&history[third..2 * third]);
    let late = Distribution::of_moves(&history[2 * third..]);

    let mut found = Vec::new();
    for (phase, before, after) in [
        (Phase::EarlyToMiddle, early, middle),
        (Phase::MiddleToLate, middle, late),
    ] {
        let (Some(before), Some(after)) = (before, after) else {
            continue;
        };
        for action in ALL_MOVES {
            let delta = after.prob(action) - before.prob(action);
            if delta.abs() > PHASE_SHIFT {
                found.push(PhaseShift { phase, action, delta });
            }
        }
    }
    found
}

fn cycle_rates(history: &[Move]) -> CycleRates {
    let n = history.len().max(1) as f64;
    let (mut forward, mut reverse) = (0usize, 0usize);
    for pair in history.windows(2) {
        if pair[1] == pair[0].counter() {
            forward += 1;
        } else if pair[1] == pair[0].beaten() {
            reverse += 1;
        }
    }
    CycleRates {
        forward: forward as f64 / n,
        reverse: reverse as f64 / n,
    }
}
