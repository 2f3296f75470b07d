//! Plays the engine against synthetic opponents and reports how it fares.
//!
//! Usage:
//!   cargo run --release --bin simulate -- [OPTIONS]
//!
//! Set `RUST_LOG=debug` to see every decision.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use counterplay::config::{load_config, EngineConfig, SelectionMode};
use counterplay::simulate::{self, ChargeRules, SimulationConfig};
use counterplay::{Engine, EngineError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Selection {
    Ensemble,
    Bandit,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rounds per match
    #[arg(long, default_value_t = 100)]
    turns: u32,

    /// Matches per opponent profile
    #[arg(long, default_value_t = 5)]
    matches: usize,

    /// Parallel matches
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Opponent RNG seed, 0 for entropy
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Charges per action; unlimited when omitted
    #[arg(long)]
    max_charges: Option<u32>,

    /// Turns per regained charge
    #[arg(long, default_value_t = 3)]
    recharge_every: u32,

    /// Overrides the selection mode from the config file
    #[arg(long, value_enum)]
    selection: Option<Selection>,

    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write match reports as JSONL to this file ("-" for stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Suppress the summary table
    #[arg(long)]
    quiet: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("simulate: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), EngineError> {
    let mut engine_config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(selection) = args.selection {
        engine_config.selection = match selection {
            Selection::Ensemble => SelectionMode::Ensemble,
            Selection::Bandit => SelectionMode::Bandit,
        };
    }
    let engine = Engine::new(engine_config)?;

    let config = SimulationConfig {
        turns: args.turns,
        matches: args.matches,
        threads: args.threads,
        seed: args.seed,
        charges: args.max_charges.map(|max_charges| ChargeRules {
            max_charges,
            recharge_interval: args.recharge_every,
        }),
    };
    let opponents = simulate::standard_opponents();

    if !args.quiet {
        eprintln!(
            "Simulating {} matches of {} turns against {} profiles ({} threads, {:?} selection)",
            config.matches * opponents.len(),
            config.turns,
            opponents.len(),
            config.threads,
            engine.config().selection,
        );
    }
    let start = Instant::now();
    let reports = simulate::run_simulation(&engine, &opponents, &config)?;
    let elapsed = start.elapsed();

    match args.output.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            let stdout = io::stdout();
            simulate::write_jsonl(&reports, &mut stdout.lock())?;
        }
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            simulate::write_jsonl(&reports, &mut out)?;
        }
        None => {}
    }

    if !args.quiet {
        eprintln!();
        eprintln!("{:<32} {:>7} {:>8} {:>8} {:>7}", "profile", "matches", "win", "loss", "cycles");
        for s in simulate::summarize(&reports) {
            eprintln!(
                "{:<32} {:>7} {:>7.1}% {:>7.1}% {:>7}",
                s.profile,
                s.matches,
                s.win_rate * 100.0,
                s.loss_rate * 100.0,
                s.cycles_detected
            );
        }
        let skipped: u32 = reports.iter().map(|r| r.skipped).sum();
        eprintln!();
        eprintln!(
            "{} matches in {:.2}s, {} turns skipped for lack of charges",
            reports.len(),
            elapsed.as_secs_f64(),
            skipped
        );
    }
    Ok(())
}
