//! Headless lane combat runner.
//!
//! Runs matches without graphics for CI verification, regression capture,
//! and balance sweeps.
//!
//! # Usage
//!
//! ```bash
//! # Run a single match with the default setup
//! cargo run -p lanestrike_headless -- run --seed 42
//!
//! # Run a match from a RON scenario file
//! cargo run -p lanestrike_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Sweep 500 seeds in parallel and report win rates
//! cargo run -p lanestrike_headless -- batch --count 500
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lanestrike_core::simulation::{MatchConfig, TICK_RATE};
use lanestrike_headless::batch::{run_batch, BatchConfig};
use lanestrike_headless::runner::{load_scenario, run_match};

#[derive(Parser)]
#[command(name = "lanestrike_headless")]
#[command(about = "Headless lane combat runner for CI and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Run {
        /// Scenario file to load (RON MatchConfig)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick budget (0 = until the match clock expires)
        #[arg(long, default_value = "0")]
        max_ticks: u64,
    },

    /// Run a batch of matches across a seed range
    Batch {
        /// Scenario file to load (RON MatchConfig)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// First seed of the sweep
        #[arg(long, default_value = "0")]
        start_seed: u64,

        /// Tick budget per game (0 = until the match clock expires)
        #[arg(long, default_value = "0")]
        max_ticks: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            scenario,
            seed,
            max_ticks,
        } => {
            let mut config = load_config(scenario)?;
            config.seed = seed;
            let budget = tick_budget(max_ticks, &config);

            let summary = run_match(config, budget);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Batch {
            scenario,
            count,
            start_seed,
            max_ticks,
        } => {
            let base = load_config(scenario)?;
            let budget = tick_budget(max_ticks, &base);

            let results = run_batch(&BatchConfig {
                base,
                count,
                start_seed,
                max_ticks: budget,
            });
            tracing::info!(
                games = results.games,
                player_wins = results.player_wins,
                enemy_wins = results.enemy_wins,
                "batch finished"
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }
    Ok(())
}

fn load_config(scenario: Option<PathBuf>) -> Result<MatchConfig, Box<dyn std::error::Error>> {
    match scenario {
        Some(path) => Ok(load_scenario(path)?),
        None => Ok(MatchConfig::default()),
    }
}

/// Resolve the tick budget: explicit, or one full match clock plus slack.
fn tick_budget(max_ticks: u64, config: &MatchConfig) -> u64 {
    if max_ticks > 0 {
        max_ticks
    } else {
        (config.match_duration_secs + 1) * u64::from(TICK_RATE)
    }
}
