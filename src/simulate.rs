//! Simulated matches against synthetic opponents.
//!
//! Plays the engine against scripted opponent profiles (fixed, cyclic,
//! biased, reactive, random) to measure how fast each behaviour is picked up.
//! Weapons can run through a [`ChargePool`] so that unavailable moves are
//! exercised as well. Matches run in parallel with rayon, each against its own
//! opponent id on one shared engine.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution as _;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::game::{Charges, Move, MoveSet, Outcome, ALL_MOVES};

/// Charge limits for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRules {
    pub max_charges: u32,
    /// Turns per regained charge, counted per action.
    pub recharge_interval: u32,
}

/// Remaining charges of each action. Every action below its maximum regains
/// one charge every `recharge_interval` turns, independently of the others.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePool {
    rules: ChargeRules,
    charges: Charges,
    since_recharge: [u32; 3],
}

impl ChargePool {
    pub fn new(rules: ChargeRules) -> Self {
        let max = rules.max_charges;
        ChargePool {
            rules,
            charges: Charges::new(max, max, max),
            since_recharge: [0; 3],
        }
    }

    pub fn charges(&self) -> Charges {
        self.charges
    }

    pub fn available(&self) -> MoveSet {
        MoveSet::from_charges(self.charges)
    }

    /// Uses one charge of `m`. Returns false if it had none.
    pub fn spend(&mut self, m: Move) -> bool {
        let slot = self.charges.get_mut(m);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    /// Advances one turn of recharging.
    pub fn tick(&mut self) {
        for m in ALL_MOVES {
            let since = &mut self.since_recharge[m.index()];
            let slot = self.charges.get_mut(m);
            if *slot >= self.rules.max_charges {
                *since = 0;
                continue;
            }
            *since += 1;
            if *since >= self.rules.recharge_interval.max(1) {
                *slot += 1;
                *since = 0;
            }
        }
    }
}

/// Scripted opponent behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpponentProfile {
    /// Always the same move.
    Fixed { play: Move },
    /// Repeats a sequence.
    Cycle { sequence: Vec<Move> },
    /// Draws from fixed weights.
    Biased { weights: [f64; 3] },
    /// Counters our previous move with probability `rate`.
    Counter { rate: f64 },
    /// Copies our previous move with probability `rate`.
    Copier { rate: f64 },
    /// After losing a round, repeats its move with probability `rate`.
    LossRepeater { rate: f64 },
    Random,
}

impl OpponentProfile {
    pub fn label(&self) -> String {
        match self {
            OpponentProfile::Fixed { play } => format!("fixed-{play}"),
            OpponentProfile::Cycle { sequence } => {
                let names: Vec<&str> = sequence.iter().map(|m| m.name()).collect();
                format!("cycle-{}", names.join("-"))
            }
            OpponentProfile::Biased { weights } => {
                format!("biased-{:.2}-{:.2}-{:.2}", weights[0], weights[1], weights[2])
            }
            OpponentProfile::Counter { rate } => format!("counter-{rate:.2}"),
            OpponentProfile::Copier { rate } => format!("copier-{rate:.2}"),
            OpponentProfile::LossRepeater { rate } => format!("loss-repeater-{rate:.2}"),
            OpponentProfile::Random => "random".to_string(),
        }
    }
}

/// A profile plus a share of uniformly random moves mixed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticOpponent {
    pub profile: OpponentProfile,
    #[serde(default)]
    pub noise: f64,
}

/// The previous round, seen from the engine's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRound {
    pub ours: Move,
    pub theirs: Move,
}

impl SyntheticOpponent {
    pub fn new(profile: OpponentProfile) -> Self {
        SyntheticOpponent { profile, noise: 0.0 }
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.clamp(0.0, 1.0);
        self
    }

    pub fn label(&self) -> String {
        if self.noise > 0.0 {
            format!("{}+noise{:.2}", self.profile.label(), self.noise)
        } else {
            self.profile.label()
        }
    }

    /// The opponent's move for round `index` (0-based).
    pub fn next_move<R: Rng + ?Sized>(&self, index: usize, last: Option<LastRound>, rng: &mut R) -> Move {
        if self.noise > 0.0 && rng.gen::<f64>() < self.noise {
            return random_move(rng);
        }
        match &self.profile {
            OpponentProfile::Fixed { play } => *play,
            OpponentProfile::Cycle { sequence } => match sequence.len() {
                0 => random_move(rng),
                n => sequence[index % n],
            },
            OpponentProfile::Biased { weights } => match WeightedIndex::new(weights.iter().copied()) {
                Ok(dist) => Move::from_index(dist.sample(rng)),
                Err(_) => random_move(rng),
            },
            OpponentProfile::Counter { rate } => match last {
                Some(l) if rng.gen::<f64>() < *rate => l.ours.counter(),
                _ => random_move(rng),
            },
            OpponentProfile::Copier { rate } => match last {
                Some(l) if rng.gen::<f64>() < *rate => l.ours,
                _ => random_move(rng),
            },
            OpponentProfile::LossRepeater { rate } => match last {
                Some(l) if Outcome::of(l.ours, l.theirs) == Outcome::Win && rng.gen::<f64>() < *rate => {
                    l.theirs
                }
                _ => random_move(rng),
            },
            OpponentProfile::Random => random_move(rng),
        }
    }
}

fn random_move<R: Rng + ?Sized>(rng: &mut R) -> Move {
    *ALL_MOVES.choose(rng).unwrap_or(&Move::Rock)
}

/// The profiles used by the default simulation run.
pub fn standard_opponents() -> Vec<SyntheticOpponent> {
    use Move::*;
    vec![
        SyntheticOpponent::new(OpponentProfile::Fixed { play: Rock }),
        SyntheticOpponent::new(OpponentProfile::Cycle {
            sequence: vec![Rock, Paper, Scissors],
        }),
        SyntheticOpponent::new(OpponentProfile::Cycle {
            sequence: vec![Rock, Rock, Paper, Scissors],
        }),
        SyntheticOpponent::new(OpponentProfile::Cycle {
            sequence: vec![Rock, Paper, Scissors],
        })
        .with_noise(0.1),
        SyntheticOpponent::new(OpponentProfile::Biased {
            weights: [0.6, 0.2, 0.2],
        }),
        SyntheticOpponent::new(OpponentProfile::Counter { rate: 0.7 }),
        SyntheticOpponent::new(OpponentProfile::Copier { rate: 0.7 }),
        SyntheticOpponent::new(OpponentProfile::LossRepeater { rate: 0.8 }),
        SyntheticOpponent::new(OpponentProfile::Random),
    ]
}

/// Settings for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Rounds per match.
    pub turns: u32,
    /// Matches per opponent profile.
    pub matches: usize,
    /// Charge limits; `None` leaves every move available.
    pub charges: Option<ChargeRules>,
    /// Parallel matches (1 = sequential).
    pub threads: usize,
    /// Opponent RNG seed (0 = use entropy).
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            turns: 100,
            matches: 1,
            charges: None,
            threads: 4,
            seed: 0,
        }
    }
}

/// One simulated round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub ours: Move,
    pub theirs: Move,
    pub outcome: Outcome,
    pub confidence: f64,
    pub reasoning: String,
}

/// Result of one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub opponent_id: String,
    pub profile: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// Turns with no charged move, where neither side played.
    pub skipped: u32,
    pub detected_cycle_length: Option<usize>,
    pub turns: Vec<TurnRecord>,
}

impl MatchReport {
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    pub fn win_rate(&self) -> f64 {
        match self.played() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }
}

/// Plays one match of `config.turns` rounds against a fresh opponent id.
pub fn play_match<R: Rng + ?Sized>(
    engine: &Engine,
    opponent_id: &str,
    opponent: &SyntheticOpponent,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MatchReport, EngineError> {
    let mut pool = config.charges.map(ChargePool::new);
    let mut report = MatchReport {
        opponent_id: opponent_id.to_string(),
        profile: opponent.label(),
        wins: 0,
        losses: 0,
        ties: 0,
        skipped: 0,
        detected_cycle_length: None,
        turns: Vec::with_capacity(config.turns as usize),
    };
    let mut last = None;
    let mut index = 0;

    for turn in 1..=config.turns {
        let available = pool.as_ref().map_or(MoveSet::ALL, ChargePool::available);
        let decision = match engine.choose_action(opponent_id, turn, available, None) {
            Ok(d) => d,
            Err(EngineError::NoLegalAction) => {
                report.skipped += 1;
                if let Some(p) = pool.as_mut() {
                    p.tick();
                }
                continue;
            }
            Err(e) => return Err(e),
        };
        let theirs = opponent.next_move(index, last, rng);
        index += 1;
        if let Some(p) = pool.as_mut() {
            p.spend(decision.action);
            p.tick();
        }

        let outcome = engine.observe(opponent_id, turn, decision.action, theirs)?;
        match outcome {
            Outcome::Win => report.wins += 1,
            Outcome::Loss => report.losses += 1,
            Outcome::Tie => report.ties += 1,
        }
        report.turns.push(TurnRecord {
            turn,
            ours: decision.action,
            theirs,
            outcome,
            confidence: decision.confidence,
            reasoning: decision.reasoning.to_string(),
        });
        last = Some(LastRound {
            ours: decision.action,
            theirs,
        });
    }

    report.detected_cycle_length = engine
        .summary(opponent_id)?
        .and_then(|s| s.detected_cycle_length);
    debug!(
        "{opponent_id}: {}W {}L {}T ({} skipped)",
        report.wins, report.losses, report.ties, report.skipped
    );
    Ok(report)
}

fn match_rng(seed: u64, index: usize) -> SmallRng {
    if seed != 0 {
        SmallRng::seed_from_u64(seed.wrapping_add(index as u64))
    } else {
        SmallRng::from_entropy()
    }
}

/// Plays `config.matches` matches against every opponent, in parallel when
/// `config.threads > 1`. Reports come back in opponent order.
pub fn run_simulation(
    engine: &Engine,
    opponents: &[SyntheticOpponent],
    config: &SimulationConfig,
) -> Result<Vec<MatchReport>, EngineError> {
    let jobs: Vec<(usize, &SyntheticOpponent)> = opponents
        .iter()
        .flat_map(|o| std::iter::repeat(o).take(config.matches))
        .enumerate()
        .collect();
    let completed = AtomicUsize::new(0);

    let run = |&(i, opponent): &(usize, &SyntheticOpponent)| {
        let id = format!("sim-{i}-{}", opponent.label());
        let mut rng = match_rng(config.seed, i);
        let report = play_match(engine, &id, opponent, config, &mut rng);
        let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("match {n}/{} finished", jobs.len());
        report
    };

    if config.threads <= 1 {
        return jobs.iter().map(run).collect();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| EngineError::Config(format!("failed to build thread pool: {e}")))?;
    pool.install(|| jobs.par_iter().map(run).collect())
}

/// Aggregate over every match against one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub profile: String,
    pub matches: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub cycles_detected: usize,
}

/// Groups reports by profile, in first-seen order.
pub fn summarize(reports: &[MatchReport]) -> Vec<ProfileSummary> {
    let mut out: Vec<(ProfileSummary, u32, u32, u32)> = Vec::new();
    for r in reports {
        let pos = match out.iter().position(|(s, ..)| s.profile == r.profile) {
            Some(pos) => pos,
            None => {
                out.push((
                    ProfileSummary {
                        profile: r.profile.clone(),
                        matches: 0,
                        win_rate: 0.0,
                        loss_rate: 0.0,
                        cycles_detected: 0,
                    },
                    0,
                    0,
                    0,
                ));
                out.len() - 1
            }
        };
        let (summary, wins, losses, played) = &mut out[pos];
        summary.matches += 1;
        summary.cycles_detected += usize::from(r.detected_cycle_length.is_some());
        *wins += r.wins;
        *losses += r.losses;
        *played += r.played();
    }
    out.into_iter()
        .map(|(mut s, wins, losses, played)| {
            if played > 0 {
                s.win_rate = wins as f64 / played as f64;
                s.loss_rate = losses as f64 / played as f64;
            }
            s
        })
        .collect()
}

/// Writes match reports as JSONL, one report per line.
pub fn write_jsonl<W: Write>(reports: &[MatchReport], out: &mut W) -> Result<(), EngineError> {
    for report in reports {
        serde_json::to_writer(&mut *out, report)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
