//! Invariants checked over randomly generated histories and concurrent use.

use std::sync::Arc;
use std::thread;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use counterplay::game::{Distribution, StatLine, SUM_TOLERANCE};
use counterplay::predict::base::weapon_stats;
use counterplay::predict::{PredictionInput, PredictionSet, Predictor, WeightedEnsemble, ALL_PREDICTORS};
use counterplay::store::TransitionTable;
use counterplay::{Engine, EngineConfig, Move, MoveSet, WeaponStats};

fn random_history(rng: &mut SmallRng, len: usize, bias: f64) -> Vec<Move> {
    (0..len)
        .map(|_| {
            if rng.gen::<f64>() < bias {
                Move::Rock
            } else {
                Move::from_index(rng.gen_range(0..3))
            }
        })
        .collect()
}

fn assert_valid(dist: &Distribution, context: &str) {
    let p = dist.as_array();
    let sum: f64 = p.iter().sum();
    assert!((sum - 1.0).abs() <= SUM_TOLERANCE, "{context}: sum {sum}");
    assert!(p.iter().all(|&x| x >= 0.0), "{context}: negative mass {p:?}");
}

#[test]
fn every_prediction_is_a_distribution() {
    let mut rng = SmallRng::seed_from_u64(17);
    for case in 0..300 {
        let len = rng.gen_range(0..120);
        let bias = rng.gen::<f64>();
        let theirs = random_history(&mut rng, len, bias);
        let ours = random_history(&mut rng, len, 0.0);
        let their_patterns = TransitionTable::from_history(&theirs, 3);
        let our_patterns = TransitionTable::from_history(&ours, 3);
        let weapon = if case % 2 == 0 {
            let mut line = || StatLine {
                attack: rng.gen_range(0.0..10.0),
                defense: rng.gen_range(0.0..5.0),
            };
            let stats = WeaponStats::new(line(), line(), line());
            weapon_stats(&stats).map(|(d, _)| d)
        } else {
            None
        };

        for predictor in ALL_PREDICTORS {
            if let Some(d) = predictor.predict(&theirs, &their_patterns, weapon.as_ref()) {
                assert_valid(&d, &format!("case {case} {predictor:?}"));
            }
        }

        let set = PredictionSet::compute(&PredictionInput {
            theirs: &theirs,
            ours: &ours,
            their_patterns: &their_patterns,
            our_patterns: &our_patterns,
            weapon: weapon.as_ref(),
        });
        for meta in set.iter() {
            assert_valid(&meta.implied, &format!("case {case} {}", meta.key));
        }

        let ensemble = WeightedEnsemble::new(ALL_PREDICTORS, 0.15, 0.01, 50);
        let members = set.ensemble_members(|_| 0.0);
        if let Some(blend) = ensemble.combine(members.iter().map(|m| (m.key.predictor, &m.implied))) {
            assert_valid(&blend, &format!("case {case} blend"));
        }
    }
}

#[test]
fn hedge_weights_sum_to_member_count() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut ensemble = WeightedEnsemble::new(ALL_PREDICTORS, 0.15, 0.01, 50);
    for round in 0..2000 {
        let actual = Move::from_index(rng.gen_range(0..3));
        let mut suggestions = Vec::new();
        for p in ALL_PREDICTORS {
            if rng.gen::<f64>() >= 0.8 {
                continue;
            }
            // Frequency is always right, the rest guess.
            let m = match p {
                Predictor::Frequency => actual.counter(),
                _ => Move::from_index(rng.gen_range(0..3)),
            };
            suggestions.push((p, m));
        }
        ensemble.update(suggestions, actual);

        let weights: Vec<f64> = ALL_PREDICTORS.iter().map(|&p| ensemble.weight(p).unwrap()).collect();
        let total: f64 = weights.iter().sum();
        assert!(
            (total - ALL_PREDICTORS.len() as f64).abs() < 1e-9,
            "round {round}: weights sum to {total}"
        );
        assert!(weights.iter().all(|&w| w > 0.0));
    }
    let best = ensemble
        .snapshot()
        .into_iter()
        .max_by(|a, b| a.weight.total_cmp(&b.weight))
        .unwrap();
    assert_eq!(best.member, Predictor::Frequency);
}

#[test]
fn engine_distributions_stay_valid_over_long_games() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let mut rng = SmallRng::seed_from_u64(99);
    for opponent in 0..5 {
        let id = format!("wanderer-{opponent}");
        let bias = opponent as f64 * 0.2;
        for turn in 1..=150 {
            let d = engine.choose_action(&id, turn, MoveSet::ALL, None).unwrap();
            assert!((0.0..=1.0).contains(&d.confidence));
            if let Some(dist) = &d.diagnostics.distribution {
                assert_valid(dist, &format!("{id} turn {turn}"));
            }
            let theirs = random_history(&mut rng, 1, bias)[0];
            engine.observe(&id, turn, d.action, theirs).unwrap();
        }
        let summary = engine.summary(&id).unwrap().unwrap();
        assert_eq!(summary.history_len, 100);
        assert_eq!(summary.observations, 150);
    }
    let total: f64 = engine.ensemble_weights().unwrap().iter().map(|m| m.weight).sum();
    assert!((total - ALL_PREDICTORS.len() as f64).abs() < 1e-9);
}

#[test]
fn concurrent_opponents_do_not_interfere() {
    let engine = Arc::new(Engine::new(EngineConfig::default()).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for o in 0..4 {
                    let id = format!("thread{t}-opp{o}");
                    let theirs = Move::from_index(o % 3);
                    for turn in 1..=40 {
                        let d = engine.choose_action(&id, turn, MoveSet::ALL, None).unwrap();
                        engine.observe(&id, turn, d.action, theirs).unwrap();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let ids = engine.opponents().unwrap();
    assert_eq!(ids.len(), 32);
    for id in &ids {
        let summary = engine.summary(id).unwrap().unwrap();
        assert_eq!(summary.observations, 40);
        assert_eq!(summary.last_turn, Some(40));
        assert_eq!(summary.detected_cycle_length, Some(1));
    }
    let total: f64 = engine.ensemble_weights().unwrap().iter().map(|m| m.weight).sum();
    assert!((total - ALL_PREDICTORS.len() as f64).abs() < 1e-9);
}

#[test]
fn one_opponent_shared_across_threads_stays_consistent() {
    let engine = Arc::new(Engine::new(EngineConfig::default()).unwrap());
    let next_turn = Arc::new(std::sync::atomic::AtomicU32::new(1));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let next_turn = Arc::clone(&next_turn);
            thread::spawn(move || {
                let mut accepted: u64 = 0;
                for _ in 0..50 {
                    let turn = next_turn.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    // Racing threads may deliver turns out of order; those are rejected whole.
                    if engine.observe("shared", turn, Move::Paper, Move::Rock).is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            })
        })
        .collect();
    let accepted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let record = engine.record_snapshot("shared").unwrap().unwrap();
    assert_eq!(record.observations(), accepted);
    assert_eq!(record.their_history().len(), record.our_history().len());
    assert_eq!(
        record.their_patterns(),
        &TransitionTable::from_history(record.their_history(), 3)
    );
}
