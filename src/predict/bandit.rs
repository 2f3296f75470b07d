//! Thompson sampling over meta-strategies.
//!
//! Each strategy keeps a Beta(alpha, beta) posterior over its win rate in the
//! opponent record. Selection draws one sample per candidate that has a
//! prediction this turn and takes the largest.

use log::trace;
use rand::Rng;
use rand_distr::{Beta, Distribution as _};

use super::meta::StrategyKey;

/// Posterior parameters of one strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posterior {
    pub alpha: f64,
    pub beta: f64,
}

impl Posterior {
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

impl Default for Posterior {
    fn default() -> Self {
        Posterior {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// Result of one Thompson draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BanditPick {
    pub key: StrategyKey,
    pub sample: f64,
    pub posterior_mean: f64,
}

/// Thompson sampler over a fixed candidate list.
#[derive(Debug, Clone)]
pub struct BanditSelector {
    candidates: Vec<StrategyKey>,
}

impl BanditSelector {
    pub fn new(candidates: Vec<StrategyKey>) -> Self {
        BanditSelector { candidates }
    }

    pub fn candidates(&self) -> &[StrategyKey] {
        &self.candidates
    }

    /// Samples every ready candidate and returns the highest draw; ties keep
    /// the earlier candidate. `posterior` returns `None` for a candidate that
    /// abstains this turn.
    pub fn select<R, F>(&self, mut posterior: F, rng: &mut R) -> Option<BanditPick>
    where
        R: Rng + ?Sized,
        F: FnMut(StrategyKey) -> Option<Posterior>,
    {
        let mut best: Option<BanditPick> = None;
        for &key in &self.candidates {
            let Some(post) = posterior(key) else { continue };
            let sample = sample_beta(post, rng);
            trace!("thompson draw {key}: {sample:.4}");
            if best.map_or(true, |b| sample > b.sample) {
                best = Some(BanditPick {
                    key,
                    sample,
                    posterior_mean: post.mean(),
                });
            }
        }
        best
    }
}

/// One Beta draw. Invalid parameters fall back to the posterior mean.
pub fn sample_beta<R: Rng + ?Sized>(post: Posterior, rng: &mut R) -> f64 {
    match Beta::new(post.alpha, post.beta) {
        Ok(dist) => dist.sample(rng),
        Err(_) => post.mean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{MetaLevel, Predictor};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn key(p: Predictor) -> StrategyKey {
        StrategyKey::new(p, MetaLevel::Direct0)
    }

    #[test]
    fn skips_abstaining_candidates() {
        let selector = BanditSelector::new(vec![key(Predictor::Frequency), key(Predictor::Markov1)]);
        let mut rng = SmallRng::seed_from_u64(3);
        let pick = selector
            .select(
                |k| (k.predictor == Predictor::Markov1).then(Posterior::default),
                &mut rng,
            )
            .unwrap();
        assert_eq!(pick.key, key(Predictor::Markov1));
        assert!((0.0..=1.0).contains(&pick.sample));
        assert!(selector.select(|_| None, &mut rng).is_none());
    }

    #[test]
    fn strong_posterior_usually_wins() {
        let selector = BanditSelector::new(vec![key(Predictor::Frequency), key(Predictor::Markov1)]);
        let mut rng = SmallRng::seed_from_u64(11);
        let mut strong = 0;
        for _ in 0..500 {
            let pick = selector
                .select(
                    |k| {
                        Some(if k.predictor == Predictor::Markov1 {
                            Posterior {
                                alpha: 40.0,
                                beta: 2.0,
                            }
                        } else {
                            Posterior {
                                alpha: 2.0,
                                beta: 40.0,
                            }
                        })
                    },
                    &mut rng,
                )
                .unwrap();
            if pick.key.predictor == Predictor::Markov1 {
                strong += 1;
            }
        }
        assert!(strong > 490, "strong arm won {strong}/500");
    }

    #[test]
    fn sampling_is_reproducible() {
        let post = Posterior {
            alpha: 3.0,
            beta: 5.0,
        };
        let a = sample_beta(post, &mut SmallRng::seed_from_u64(9));
        let b = sample_beta(post, &mut SmallRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
