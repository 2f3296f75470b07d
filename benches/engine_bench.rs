use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use counterplay::predict::{PredictionInput, PredictionSet};
use counterplay::simulate::{self, SimulationConfig};
use counterplay::store::TransitionTable;
use counterplay::{Engine, EngineConfig, Move, MoveSet, SelectionMode};

/// A 100-round history mixing a cycle with some noise.
fn full_history() -> Vec<Move> {
    (0..100)
        .map(|i| if i % 7 == 0 { Move::Rock } else { Move::from_index(i % 3) })
        .collect()
}

/// An engine with one opponent already at a full window.
fn warmed_engine(selection: SelectionMode) -> Engine {
    let engine = Engine::new(EngineConfig {
        selection,
        ..EngineConfig::default()
    })
    .unwrap();
    for (i, &theirs) in full_history().iter().enumerate() {
        let turn = i as u32 + 1;
        let d = engine.choose_action("bench", turn, MoveSet::ALL, None).unwrap();
        engine.observe("bench", turn, d.action, theirs).unwrap();
    }
    engine
}

fn bench_prediction_set(c: &mut Criterion) {
    let theirs = full_history();
    let ours: Vec<Move> = theirs.iter().map(|m| m.counter()).collect();
    let their_patterns = TransitionTable::from_history(&theirs, 3);
    let our_patterns = TransitionTable::from_history(&ours, 3);
    c.bench_function("prediction_set_full_window", |b| {
        b.iter(|| {
            PredictionSet::compute(black_box(&PredictionInput {
                theirs: &theirs,
                ours: &ours,
                their_patterns: &their_patterns,
                our_patterns: &our_patterns,
                weapon: None,
            }))
        })
    });
}

fn bench_choose_action(c: &mut Criterion) {
    let ensemble = warmed_engine(SelectionMode::Ensemble);
    c.bench_function("choose_action_ensemble", |b| {
        b.iter(|| ensemble.choose_action(black_box("bench"), 101, MoveSet::ALL, None))
    });

    let bandit = warmed_engine(SelectionMode::Bandit);
    c.bench_function("choose_action_bandit", |b| {
        b.iter(|| bandit.choose_action(black_box("bench"), 101, MoveSet::ALL, None))
    });
}

fn bench_observe(c: &mut Criterion) {
    let engine = warmed_engine(SelectionMode::Ensemble);
    let mut turn = 100;
    c.bench_function("observe_full_window", |b| {
        b.iter(|| {
            turn += 1;
            engine.observe(black_box("bench"), turn, Move::Paper, Move::from_index(turn as usize % 3))
        })
    });
}

fn bench_table_rebuild(c: &mut Criterion) {
    let history = full_history();
    c.bench_function("transition_table_from_history", |b| {
        b.iter(|| TransitionTable::from_history(black_box(&history), 3))
    });
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));
    let opponents = simulate::standard_opponents();
    let config = SimulationConfig {
        turns: 100,
        matches: 1,
        threads: 4,
        seed: 7,
        charges: None,
    };
    group.bench_function("standard_profiles_100_turns", |b| {
        b.iter(|| {
            let engine = Engine::new(EngineConfig::default()).unwrap();
            simulate::run_simulation(&engine, black_box(&opponents), &config).unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_prediction_set,
    bench_choose_action,
    bench_observe,
    bench_table_rebuild,
    bench_simulation,
);
criterion_main!(benches);
