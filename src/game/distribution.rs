//! Probability distributions over the opponent's next move.

use serde::Serialize;

use super::moves::{Move, MoveSet, ALL_MOVES};

/// Tolerance used when checking that a distribution sums to one.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// A probability vector indexed by [`Move::index`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution([f64; 3]);

impl Distribution {
    pub fn uniform() -> Self {
        Distribution([1.0 / 3.0; 3])
    }

    /// All mass on a single move.
    pub fn one_hot(m: Move) -> Self {
        let mut p = [0.0; 3];
        p[m.index()] = 1.0;
        Distribution(p)
    }

    /// Normalizes non-negative weights. Returns `None` when nothing is left
    /// to normalize (all zero, negative or non-finite mass).
    pub fn from_weights(weights: [f64; 3]) -> Option<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return None;
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }
        Some(Distribution([
            weights[0] / total,
            weights[1] / total,
            weights[2] / total,
        ]))
    }

    /// Empirical distribution of move counts.
    pub fn from_counts(counts: [u32; 3]) -> Option<Self> {
        Self::from_weights([counts[0] as f64, counts[1] as f64, counts[2] as f64])
    }

    /// Empirical distribution of a move sequence.
    pub fn of_moves(moves: &[Move]) -> Option<Self> {
        let mut counts = [0u32; 3];
        for m in moves {
            counts[m.index()] += 1;
        }
        Self::from_counts(counts)
    }

    pub fn prob(&self, m: Move) -> f64 {
        self.0[m.index()]
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    /// Most likely move; ties go to the earlier move in priority order.
    pub fn argmax(&self) -> Move {
        let mut best = Move::Rock;
        for m in ALL_MOVES {
            if self.prob(m) > self.prob(best) {
                best = m;
            }
        }
        best
    }

    /// Moves mass on `x` to `counter^k(x)`.
    pub fn rotate(&self, k: usize) -> Self {
        let mut p = [0.0; 3];
        for i in 0..3 {
            p[(i + k) % 3] = self.0[i];
        }
        Distribution(p)
    }

    /// Expected payoff of playing `ours` against this distribution:
    /// P(we beat them) − P(they beat us).
    pub fn expected_value(&self, ours: Move) -> f64 {
        self.prob(ours.beaten()) - self.prob(ours.counter())
    }

    /// Best response restricted to `available`, with its expected value.
    /// Ties go to the earlier move in priority order.
    pub fn best_response(&self, available: MoveSet) -> Option<(Move, f64)> {
        let mut best: Option<(Move, f64)> = None;
        for m in available.iter() {
            let ev = self.expected_value(m);
            match best {
                Some((_, b)) if ev <= b => {}
                _ => best = Some((m, ev)),
            }
        }
        best
    }

    /// Normalized Shannon entropy (base 3): 0 for a certain move, 1 for uniform.
    pub fn entropy(&self) -> f64 {
        let h: f64 = self
            .0
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum();
        (h / 3f64.ln()).clamp(0.0, 1.0)
    }

    /// Squared distance from uniform, scaled so a one-hot vector scores 1.
    pub fn skew(&self) -> f64 {
        let var: f64 = self.0.iter().map(|p| (p - 1.0 / 3.0).powi(2)).sum();
        (var / (2.0 / 3.0)).clamp(0.0, 1.0)
    }

    /// Checks the sum-to-one and non-negativity invariants.
    pub fn is_valid(&self) -> bool {
        let total: f64 = self.0.iter().sum();
        self.0.iter().all(|p| p.is_finite() && *p >= 0.0) && (total - 1.0).abs() <= SUM_TOLERANCE
    }
}

/// Accumulates weighted distributions into one blended distribution.
#[derive(Debug, Clone, Default)]
pub struct Blend {
    mass: [f64; 3],
    total_weight: f64,
}

impl Blend {
    pub fn new() -> Self {
        Blend::default()
    }

    pub fn add(&mut self, dist: &Distribution, weight: f64) {
        if weight <= 0.0 || !weight.is_finite() {
            return;
        }
        for (acc, p) in self.mass.iter_mut().zip(dist.as_array()) {
            *acc += weight * p;
        }
        self.total_weight += weight;
    }

    pub fn is_empty(&self) -> bool {
        self.total_weight <= 0.0
    }

    /// Weight-normalized sum, or `None` when nothing was added.
    pub fn finish(&self) -> Option<Distribution> {
        Distribution::from_weights(self.mass)
    }
}
