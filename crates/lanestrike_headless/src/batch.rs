//! Parallel seed sweeps for balance testing.
//!
//! Runs the same match configuration across a range of seeds and
//! aggregates win rates and match lengths.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use lanestrike_core::simulation::{MatchConfig, MatchOutcome};

use crate::runner::{run_match, MatchSummary};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Base match configuration; the seed field is overwritten per game.
    pub base: MatchConfig,
    /// Number of games to run.
    pub count: u32,
    /// First seed; games use `start_seed..start_seed + count`.
    pub start_seed: u64,
    /// Tick budget per game.
    pub max_ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            base: MatchConfig::default(),
            count: 100,
            start_seed: 0,
            max_ticks: 20 * 900,
        }
    }
}

/// Aggregated results of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Games played.
    pub games: u32,
    /// Games the player side won.
    pub player_wins: u32,
    /// Games the enemy side won.
    pub enemy_wins: u32,
    /// Games that hit the match clock.
    pub expired: u32,
    /// Games that hit the tick budget without ending.
    pub unfinished: u32,
    /// Mean ticks per game.
    pub average_ticks: f64,
    /// Per-game summaries, in seed order.
    pub summaries: Vec<MatchSummary>,
}

/// Run `config.count` games in parallel and aggregate the results.
#[must_use]
pub fn run_batch(config: &BatchConfig) -> BatchResults {
    let summaries: Vec<MatchSummary> = (0..config.count)
        .into_par_iter()
        .map(|i| {
            let mut game = config.base.clone();
            game.seed = config.start_seed + u64::from(i);
            run_match(game, config.max_ticks)
        })
        .collect();

    let mut results = BatchResults {
        games: config.count,
        player_wins: 0,
        enemy_wins: 0,
        expired: 0,
        unfinished: 0,
        average_ticks: 0.0,
        summaries,
    };

    let mut total_ticks = 0u64;
    for summary in &results.summaries {
        total_ticks += summary.ticks;
        match summary.outcome {
            Some(MatchOutcome::PlayerVictory) => results.player_wins += 1,
            Some(MatchOutcome::EnemyVictory) => results.enemy_wins += 1,
            Some(MatchOutcome::Expired) => results.expired += 1,
            None => results.unfinished += 1,
        }
    }
    if results.games > 0 {
        results.average_ticks = total_ticks as f64 / f64::from(results.games);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_accounts_for_every_game() {
        let config = BatchConfig {
            count: 4,
            start_seed: 10,
            max_ticks: 600,
            ..BatchConfig::default()
        };
        let results = run_batch(&config);

        assert_eq!(results.games, 4);
        assert_eq!(results.summaries.len(), 4);
        assert_eq!(
            results.player_wins + results.enemy_wins + results.expired + results.unfinished,
            4
        );
        assert!(results.average_ticks > 0.0);

        // Seeds assigned in order
        let seeds: Vec<u64> = results.summaries.iter().map(|s| s.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
    }
}
