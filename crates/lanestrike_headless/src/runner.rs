//! Single-match headless runner.
//!
//! Builds a simulation from a [`MatchConfig`] (defaults or a RON scenario
//! file), ticks it to completion or a tick budget, and reports a summary
//! suitable for JSON output.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lanestrike_core::ai::AiStrategy;
use lanestrike_core::simulation::{MatchConfig, MatchOutcome, Simulation};
use lanestrike_core::units::Side;

/// Error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Scenario file not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read the scenario file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the scenario RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Load a match configuration from a RON scenario file.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<MatchConfig, RunnerError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RunnerError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config: MatchConfig = ron::from_str(&contents)?;
    Ok(config)
}

/// Aggregated results of one headless match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Seed the match ran with.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Match seconds simulated.
    pub elapsed_secs: u64,
    /// How the match ended; `None` when the tick budget ran out first.
    pub outcome: Option<MatchOutcome>,
    /// Player base health at the end.
    pub player_base_health: i32,
    /// Enemy base health at the end.
    pub enemy_base_health: i32,
    /// Total units spawned.
    pub units_spawned: u64,
    /// Total unit deaths.
    pub unit_deaths: u64,
    /// Total units that reached a base.
    pub base_arrivals: u64,
    /// Upgrades the opponent AI purchased.
    pub ai_purchases: u64,
    /// The opponent's final strategy.
    pub final_strategy: AiStrategy,
    /// The opponent's final effectiveness score (0-100).
    pub strategy_effectiveness: u32,
    /// State hash at the end, for regression comparison.
    pub state_hash: u64,
}

/// Run one match to completion or `max_ticks`, whichever comes first.
#[must_use]
pub fn run_match(config: MatchConfig, max_ticks: u64) -> MatchSummary {
    let seed = config.seed;
    let mut sim = Simulation::new(config);

    let mut units_spawned = 0u64;
    let mut unit_deaths = 0u64;
    let mut base_arrivals = 0u64;
    let mut ai_purchases = 0u64;
    let mut outcome = None;

    for _ in 0..max_ticks {
        let events = sim.tick();
        units_spawned += events.spawned.len() as u64;
        unit_deaths += events.deaths.len() as u64;
        base_arrivals += events.arrivals.len() as u64;
        ai_purchases += events.purchases.len() as u64;

        if let Some(change) = events.strategy_change {
            tracing::info!(strategy = ?change, tick = sim.get_tick(), "strategy change");
        }
        if let Some(result) = events.match_over {
            outcome = Some(result);
            break;
        }
    }

    tracing::info!(
        seed,
        ticks = sim.get_tick(),
        ?outcome,
        player_base = sim.base_health(Side::Player),
        enemy_base = sim.base_health(Side::Enemy),
        "match finished"
    );

    MatchSummary {
        seed,
        ticks: sim.get_tick(),
        elapsed_secs: sim.elapsed_secs(),
        outcome,
        player_base_health: sim.base_health(Side::Player),
        enemy_base_health: sim.base_health(Side::Enemy),
        units_spawned,
        unit_deaths,
        base_arrivals,
        ai_purchases,
        final_strategy: sim.current_strategy(),
        strategy_effectiveness: sim.strategy_effectiveness(),
        state_hash: sim.state_hash(),
    }
}
