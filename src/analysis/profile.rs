//! Statistical behaviour profiling of an opponent.
//!
//! Three checks, each gated on a minimum sample size so that short windows
//! never produce a verdict:
//! - bias: chi-square goodness of fit against uniform play (df = 2);
//! - reaction to our previous move: one-sided binomial tests of the counter
//!   rate and the copy rate against 1/3;
//! - reaction to losing: repeat / counter-switch / other rates after rounds
//!   the opponent lost.

use std::fmt;

use log::warn;
use serde::Serialize;
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};

use crate::game::{Distribution, Move, Outcome};

pub const BIAS_MIN_SAMPLES: usize = 15;
pub const BIAS_MIN_SHARE: f64 = 0.45;
pub const REACTIVE_MIN_SAMPLES: usize = 20;
pub const SIGNIFICANCE: f64 = 0.05;
/// Post-loss rounds needed before reporting, exclusive.
pub const POST_LOSS_MIN_ROUNDS: usize = 5;
pub const POST_LOSS_MIN_RATE: f64 = 0.4;

pub const PREDICTABLE_ENTROPY: f64 = 0.5;
pub const RANDOM_ENTROPY: f64 = 0.85;

/// Coarse entropy bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyClass {
    Predictable,
    Biased,
    Random,
}

impl EntropyClass {
    pub fn classify(entropy: f64) -> Self {
        if entropy < PREDICTABLE_ENTROPY {
            EntropyClass::Predictable
        } else if entropy < RANDOM_ENTROPY {
            EntropyClass::Biased
        } else {
            EntropyClass::Random
        }
    }
}

/// Normalized entropy of a move history, or `None` when it is empty.
pub fn history_entropy(history: &[Move]) -> Option<f64> {
    Distribution::of_moves(history).map(|d| d.entropy())
}

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Reactive,
    Biased,
    Cyclic,
    Stable,
}

/// How the opponent moved after rounds it lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostLossReaction {
    pub rounds: usize,
    pub repeat_rate: f64,
    pub counter_rate: f64,
    pub other_rate: f64,
}

impl PostLossReaction {
    /// The reaction that clears the reporting rate, if any.
    pub fn dominant(&self) -> Option<(&'static str, f64)> {
        [
            ("repeat", self.repeat_rate),
            ("counter", self.counter_rate),
            ("other", self.other_rate),
        ]
        .into_iter()
        .filter(|&(_, r)| r > POST_LOSS_MIN_RATE)
        .fold(None, |best: Option<(&'static str, f64)>, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
    }
}

/// A rate tested against chance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateTest {
    pub rate: f64,
    pub p_value: f64,
}

impl RateTest {
    pub fn significant(&self) -> bool {
        self.p_value < SIGNIFICANCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorProfile {
    pub samples: usize,
    pub chi_square: Option<f64>,
    /// Upper-tail probability of `chi_square` under uniform play.
    pub bias_p_value: Option<f64>,
    /// Dominant move and its share, when the bias test passes.
    pub bias: Option<(Move, f64)>,
    /// Opponent played the counter of our previous move.
    pub counter: Option<RateTest>,
    /// Opponent played our previous move.
    pub copy: Option<RateTest>,
    pub post_loss: Option<PostLossReaction>,
    pub cycle: Option<usize>,
    pub classification: Behavior,
}

impl BehaviorProfile {
    /// Short human-readable description, e.g. `biased:rock@0.80`.
    pub fn describe(&self) -> String {
        match self.classification {
            Behavior::Reactive => {
                let counter = self.counter.filter(RateTest::significant);
                let copy = self.copy.filter(RateTest::significant);
                match (counter, copy) {
                    (Some(c), Some(k)) if k.rate > c.rate => format!("reactive:copy@{:.2}", k.rate),
                    (Some(c), _) => format!("reactive:counter@{:.2}", c.rate),
                    (None, Some(k)) => format!("reactive:copy@{:.2}", k.rate),
                    (None, None) => "reactive".to_string(),
                }
            }
            Behavior::Cyclic => format!("cycle:{}", self.cycle.unwrap_or_default()),
            Behavior::Biased => match self.bias {
                Some((m, share)) => format!("biased:{m}@{share:.2}"),
                None => "biased".to_string(),
            },
            Behavior::Stable => "stable".to_string(),
        }
    }
}

impl fmt::Display for BehaviorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Chi-square statistic of the move counts against uniform play.
pub fn chi_square_uniform(history: &[Move]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let mut counts = [0usize; 3];
    for m in history {
        counts[m.index()] += 1;
    }
    let expected = history.len() as f64 / 3.0;
    Some(
        counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum(),
    )
}

/// P(X >= successes) for X ~ Binomial(trials, p).
pub fn binomial_upper_tail(successes: usize, trials: usize, p: f64) -> f64 {
    if successes == 0 {
        return 1.0;
    }
    if successes > trials {
        return 0.0;
    }
    match Binomial::new(p, trials as u64) {
        // sf(k) is P(X > k).
        Ok(binomial) => binomial.sf(successes as u64 - 1).clamp(0.0, 1.0),
        Err(err) => {
            warn!("binomial test over {trials} trials at p = {p} rejected: {err}");
            1.0
        }
    }
}

/// P(X >= chi) for X ~ chi-square with two degrees of freedom, the
/// distribution of [`chi_square_uniform`] under uniform play.
pub fn chi_square_p_value(chi: f64) -> f64 {
    match ChiSquared::new(2.0) {
        Ok(dist) => dist.sf(chi.max(0.0)).clamp(0.0, 1.0),
        Err(err) => {
            warn!("chi-square distribution unavailable: {err}");
            1.0
        }
    }
}

fn rate_test(hits: usize, trials: usize) -> RateTest {
    RateTest {
        rate: hits as f64 / trials as f64,
        p_value: binomial_upper_tail(hits, trials, 1.0 / 3.0),
    }
}

/// Profiles the opponent from aligned histories (`ours[i]` and `theirs[i]`
/// were played in the same round). `cycle` is the period found by
/// [`super::detect_cycle`], if any.
pub fn profile(ours: &[Move], theirs: &[Move], cycle: Option<usize>) -> BehaviorProfile {
    let n = ours.len().min(theirs.len());
    let (ours, theirs) = (&ours[ours.len() - n..], &theirs[theirs.len() - n..]);

    let chi_square = chi_square_uniform(theirs);
    let bias_p_value = chi_square.map(chi_square_p_value);
    let bias = match (bias_p_value, Distribution::of_moves(theirs)) {
        (Some(p), Some(dist)) if n >= BIAS_MIN_SAMPLES && p < SIGNIFICANCE => {
            let favorite = dist.argmax();
            let share = dist.prob(favorite);
            (share > BIAS_MIN_SHARE).then_some((favorite, share))
        }
        _ => None,
    };

    let (mut counter, mut copy) = (None, None);
    if n >= REACTIVE_MIN_SAMPLES {
        let trials = n - 1;
        let counter_hits = (1..n).filter(|&i| theirs[i] == ours[i - 1].counter()).count();
        let copy_hits = (1..n).filter(|&i| theirs[i] == ours[i - 1]).count();
        counter = Some(rate_test(counter_hits, trials));
        copy = Some(rate_test(copy_hits, trials));
    }

    let post_loss = post_loss_reaction(ours, theirs);

    let reactive = counter.is_some_and(|t| t.significant()) || copy.is_some_and(|t| t.significant());
    let cyclic = cycle.filter(|&p| p >= 2);
    // An exact cycle explains any apparent reaction to our moves.
    let classification = if cyclic.is_some() {
        Behavior::Cyclic
    } else if reactive {
        Behavior::Reactive
    } else if bias.is_some() {
        Behavior::Biased
    } else {
        Behavior::Stable
    };

    BehaviorProfile {
        samples: n,
        chi_square,
        bias_p_value,
        bias,
        counter,
        copy,
        post_loss,
        cycle,
        classification,
    }
}

/// Reaction after rounds the opponent lost, once there are enough of them.
fn post_loss_reaction(ours: &[Move], theirs: &[Move]) -> Option<PostLossReaction> {
    let (mut repeat, mut switch, mut other) = (0usize, 0usize, 0usize);
    for i in 1..theirs.len() {
        if Outcome::of(ours[i - 1], theirs[i - 1]) != Outcome::Win {
            continue;
        }
        let prev = theirs[i - 1];
        if theirs[i] == prev {
            repeat += 1;
        } else if theirs[i] == prev.counter() {
            switch += 1;
        } else {
            other += 1;
        }
    }
    let rounds = repeat + switch + other;
    if rounds <= POST_LOSS_MIN_ROUNDS {
        return None;
    }
    let rate = |k: usize| k as f64 / rounds as f64;
    Some(PostLossReaction {
        rounds,
        repeat_rate: rate(repeat),
        counter_rate: rate(switch),
        other_rate: rate(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Move::*;

    #[test]
    fn entropy_classes() {
        assert_eq!(EntropyClass::classify(0.1), EntropyClass::Predictable);
        assert_eq!(EntropyClass::classify(0.5), EntropyClass::Biased);
        assert_eq!(EntropyClass::classify(0.85), EntropyClass::Random);
        assert_eq!(history_entropy(&[Rock; 5]), Some(0.0));
        assert!(history_entropy(&[]).is_none());
    }

    #[test]
    fn binomial_tail_values() {
        assert_eq!(binomial_upper_tail(0, 10, 0.3), 1.0);
        assert_eq!(binomial_upper_tail(11, 10, 0.3), 0.0);
        // P(X >= 2) for Bin(2, 0.5) = 0.25.
        assert!((binomial_upper_tail(2, 2, 0.5) - 0.25).abs() < 1e-9);
        // P(X >= 1) for Bin(3, 0.5) = 0.875.
        assert!((binomial_upper_tail(1, 3, 0.5) - 0.875).abs() < 1e-9);
        // Chance-level hits are not significant, a big excess is.
        assert!(binomial_upper_tail(10, 30, 1.0 / 3.0) > 0.3);
        assert!(binomial_upper_tail(20, 30, 1.0 / 3.0) < 0.001);
    }

    #[test]
    fn binomial_tail_holds_up_on_long_windows() {
        // (2/3)^2100 underflows; the tail must still come out near one half.
        let tail = binomial_upper_tail(700, 2100, 1.0 / 3.0);
        assert!((0.4..0.6).contains(&tail), "tail {tail}");
        assert!(binomial_upper_tail(1, 5000, 1.0 / 3.0) > 0.999);
        assert!(binomial_upper_tail(1900, 5000, 1.0 / 3.0) < 1e-6);
    }

    #[test]
    fn chi_square_p_values() {
        // The df = 2 critical value at 5% is 5.991.
        assert!((chi_square_p_value(5.991) - 0.05).abs() < 1e-3);
        assert!(chi_square_p_value(0.0) > 0.999);
        assert!(chi_square_p_value(60.0) < 1e-9);
    }

    #[test]
    fn balanced_long_window_is_not_reactive() {
        // Digit sum of i in base 3: a period-27 sequence with every move
        // equally common and no period of 8 or less.
        let theirs: Vec<Move> = (0..2160usize)
            .map(|i| Move::from_index((i % 3 + i / 3 % 3 + i / 9 % 3) % 3))
            .collect();
        let ours = vec![Rock; 2160];
        let p = profile(&ours, &theirs, None);
        let counter = p.counter.unwrap();
        let copy = p.copy.unwrap();
        assert!((counter.rate - 1.0 / 3.0).abs() < 0.01);
        assert!(counter.p_value > 0.3, "counter p {}", counter.p_value);
        assert!(copy.p_value > 0.3, "copy p {}", copy.p_value);
        assert!(p.bias.is_none());
        assert!(p.bias_p_value.unwrap() > 0.99);
        assert_eq!(p.classification, Behavior::Stable);
    }

    #[test]
    fn chi_square_of_fixed_play() {
        let chi = chi_square_uniform(&[Rock; 30]).unwrap();
        assert!((chi - 60.0).abs() < 1e-9);
        let balanced: Vec<Move> = [Rock, Paper, Scissors].repeat(10);
        assert!(chi_square_uniform(&balanced).unwrap() < 1e-9);
    }

    #[test]
    fn fixed_opponent_is_biased() {
        let theirs = vec![Rock; 20];
        let ours = vec![Paper; 20];
        let p = profile(&ours, &theirs, Some(1));
        assert_eq!(p.bias, Some((Rock, 1.0)));
        assert_eq!(p.classification, Behavior::Biased);
        assert_eq!(p.describe(), "biased:rock@1.00");
    }

    #[test]
    fn counter_player_is_reactive() {
        // Our moves cycle; theirs always counter our previous move.
        let ours: Vec<Move> = [Rock, Scissors, Scissors, Paper, Rock, Paper].repeat(5);
        let mut theirs = vec![Scissors];
        theirs.extend(ours[..ours.len() - 1].iter().map(|m| m.counter()));
        let p = profile(&ours, &theirs, None);
        let counter = p.counter.unwrap();
        assert!((counter.rate - 1.0).abs() < 1e-12);
        assert!(counter.significant());
        assert_eq!(p.classification, Behavior::Reactive);
        assert!(p.describe().starts_with("reactive:counter"));
    }

    #[test]
    fn short_history_is_stable() {
        let p = profile(&[Rock, Paper], &[Paper, Paper], None);
        assert_eq!(p.classification, Behavior::Stable);
        assert!(p.counter.is_none() && p.bias.is_none() && p.post_loss.is_none());
    }

    #[test]
    fn post_loss_repeaters_are_reported() {
        // We always win with Paper against Rock: the opponent lost every
        // round and keeps repeating.
        let ours = vec![Paper; 10];
        let theirs = vec![Rock; 10];
        let reaction = profile(&ours, &theirs, None).post_loss.unwrap();
        assert_eq!(reaction.rounds, 9);
        assert_eq!(reaction.dominant(), Some(("repeat", 1.0)));
    }

    #[test]
    fn cyclic_classification() {
        let theirs: Vec<Move> = [Rock, Paper, Scissors].repeat(7);
        let ours = vec![Rock; 21];
        let p = profile(&ours, &theirs, Some(3));
        assert_eq!(p.classification, Behavior::Cyclic);
        assert_eq!(p.describe(), "cycle:3");
    }
}
