//! The automated opponent: periodic strategy selection and purchases.
//!
//! Two independent timers drive the AI. The strategy timer re-evaluates a
//! discrete strategy from match time and both bases' health fractions; the
//! decision timer rolls a purchase gate and, when it passes, buys an upgrade
//! from the current strategy's candidate set. All stochastic choices draw
//! from the injected seeded RNG, so identical seeds replay identically.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::economy::{SideEconomy, UpgradeEffect, UpgradeKind};
use crate::math::Fixed;

/// Purchase gate in permille (0.3 probability).
const PURCHASE_CHANCE_PERMILLE: u32 = 300;

/// Rush multiplies the purchase gate by 1.5.
const RUSH_CHANCE_PERMILLE: u32 = 450;

/// The opponent's discrete behavioral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiStrategy {
    /// Push damage upgrades and pressure the player base.
    Aggressive,
    /// Shore up the base and income while behind.
    Defensive,
    /// A mix of everything.
    Balanced,
    /// Build income before committing.
    Economic,
    /// Early-game aggression with cheap tiers.
    Rush,
}

/// Game state the AI reads each evaluation.
#[derive(Debug, Clone, Copy)]
pub struct AiObservation {
    /// Seconds since the match started.
    pub elapsed_secs: u64,
    /// Player base health over its starting health.
    pub player_base_frac: Fixed,
    /// Enemy base health over its starting health.
    pub enemy_base_frac: Fixed,
    /// The enemy side's current income.
    pub enemy_income: i32,
}

/// What the AI did this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiTickOutcome {
    /// Set when the strategy re-evaluation picked a different strategy.
    pub strategy_changed: Option<AiStrategy>,
    /// Set when a purchase went through.
    pub purchase: Option<(UpgradeKind, UpgradeEffect)>,
}

/// Periodic strategy selection and purchase decisions for the enemy side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentAi {
    strategy: AiStrategy,
    /// Ticks between strategy re-evaluations.
    pub strategy_interval: u64,
    /// Ticks between purchase decisions.
    pub decision_interval: u64,
    last_strategy_tick: u64,
    last_decision_tick: u64,
}

impl OpponentAi {
    /// Create an AI with the given timer intervals in ticks.
    #[must_use]
    pub fn new(strategy_interval: u64, decision_interval: u64) -> Self {
        Self {
            strategy: AiStrategy::Balanced,
            strategy_interval,
            decision_interval,
            last_strategy_tick: 0,
            last_decision_tick: 0,
        }
    }

    /// The current strategy.
    #[must_use]
    pub const fn strategy(&self) -> AiStrategy {
        self.strategy
    }

    /// Deterministic strategy table over match time and base health
    /// fractions.
    #[must_use]
    pub fn select_strategy(
        elapsed_secs: u64,
        player_base_frac: Fixed,
        enemy_base_frac: Fixed,
    ) -> AiStrategy {
        let half = Fixed::from_num(0.5);

        // Early game: all-in pressure
        if elapsed_secs < 120 {
            return AiStrategy::Rush;
        }

        // Mid game
        if elapsed_secs < 480 {
            if enemy_base_frac < half {
                return AiStrategy::Defensive;
            }
            if player_base_frac < Fixed::from_num(0.7) {
                return AiStrategy::Aggressive;
            }
            return AiStrategy::Balanced;
        }

        // Late game
        if enemy_base_frac < Fixed::from_num(0.3) {
            return AiStrategy::Defensive;
        }
        if player_base_frac < half {
            return AiStrategy::Aggressive;
        }
        AiStrategy::Economic
    }

    /// Advance both AI timers.
    ///
    /// Fires strategy re-evaluation and/or a purchase decision when their
    /// intervals have elapsed; each timer resets after firing.
    pub fn tick(
        &mut self,
        now: u64,
        observation: AiObservation,
        economy: &mut SideEconomy,
        rng: &mut impl Rng,
    ) -> AiTickOutcome {
        let mut outcome = AiTickOutcome::default();

        if now - self.last_strategy_tick >= self.strategy_interval {
            let next = Self::select_strategy(
                observation.elapsed_secs,
                observation.player_base_frac,
                observation.enemy_base_frac,
            );
            if next != self.strategy {
                tracing::info!(from = ?self.strategy, to = ?next, "AI strategy change");
                self.strategy = next;
                outcome.strategy_changed = Some(next);
            }
            self.last_strategy_tick = now;
        }

        if now - self.last_decision_tick >= self.decision_interval {
            outcome.purchase = self.decide(economy, rng);
            self.last_decision_tick = now;
        }

        outcome
    }

    /// Roll the purchase gate and attempt one strategy-guided purchase.
    ///
    /// Gold floors and candidate sets are per-strategy; an unaffordable or
    /// capped pick falls through as a silent no-op.
    fn decide(
        &self,
        economy: &mut SideEconomy,
        rng: &mut impl Rng,
    ) -> Option<(UpgradeKind, UpgradeEffect)> {
        let gate = match self.strategy {
            AiStrategy::Rush => RUSH_CHANCE_PERMILLE,
            _ => PURCHASE_CHANCE_PERMILLE,
        };
        if rng.gen_range(0..1000) >= gate {
            return None;
        }

        let kind = match self.strategy {
            AiStrategy::Aggressive => {
                if economy.gold < 100 {
                    return None;
                }
                pick(
                    &[
                        UpgradeKind::MeleeTier,
                        UpgradeKind::RangedTier,
                        UpgradeKind::SiegeTier,
                    ],
                    rng,
                )
            }
            AiStrategy::Defensive => {
                if economy.gold < 150 {
                    return None;
                }
                pick(&[UpgradeKind::BaseDefense, UpgradeKind::Income], rng)
            }
            AiStrategy::Balanced => pick(&UpgradeKind::ALL, rng),
            AiStrategy::Economic => {
                if economy.gold < 50 {
                    return None;
                }
                // 70% bias toward income
                if rng.gen_range(0..10) < 7 {
                    UpgradeKind::Income
                } else {
                    pick(&[UpgradeKind::MeleeTier, UpgradeKind::RangedTier], rng)
                }
            }
            AiStrategy::Rush => {
                if economy.gold < 75 {
                    return None;
                }
                pick(&[UpgradeKind::MeleeTier, UpgradeKind::RangedTier], rng)
            }
        };

        economy.purchase(kind).map(|effect| (kind, effect))
    }

    /// Diagnostic 0-100 score of how well the current strategy is doing.
    #[must_use]
    pub fn effectiveness(&self, observation: AiObservation) -> u32 {
        let one = Fixed::from_num(1);
        let hundred = Fixed::from_num(100);

        let score = match self.strategy {
            AiStrategy::Aggressive => (one - observation.player_base_frac) * hundred,
            AiStrategy::Defensive => observation.enemy_base_frac * hundred,
            AiStrategy::Balanced => {
                (observation.enemy_base_frac + (one - observation.player_base_frac))
                    * Fixed::from_num(50)
            }
            AiStrategy::Economic => {
                Fixed::from_num(observation.enemy_income) / Fixed::from_num(20) * hundred
            }
            AiStrategy::Rush => {
                if observation.elapsed_secs < 120 {
                    hundred
                } else {
                    Fixed::from_num(50)
                }
            }
        };

        score.clamp(Fixed::ZERO, hundred).round().to_num()
    }
}

/// Uniform pick from a non-empty candidate set.
fn pick(candidates: &[UpgradeKind], rng: &mut impl Rng) -> UpgradeKind {
    candidates[rng.gen_range(0..candidates.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn frac(v: f64) -> Fixed {
        Fixed::from_num(v)
    }

    fn observation(elapsed: u64, player: f64, enemy: f64, income: i32) -> AiObservation {
        AiObservation {
            elapsed_secs: elapsed,
            player_base_frac: frac(player),
            enemy_base_frac: frac(enemy),
            enemy_income: income,
        }
    }

    #[test]
    fn test_strategy_table_early_game() {
        assert_eq!(
            OpponentAi::select_strategy(90, frac(1.0), frac(1.0)),
            AiStrategy::Rush
        );
    }

    #[test]
    fn test_strategy_table_mid_game() {
        assert_eq!(
            OpponentAi::select_strategy(300, frac(1.0), frac(0.4)),
            AiStrategy::Defensive
        );
        assert_eq!(
            OpponentAi::select_strategy(300, frac(0.6), frac(0.8)),
            AiStrategy::Aggressive
        );
        assert_eq!(
            OpponentAi::select_strategy(300, frac(0.9), frac(0.8)),
            AiStrategy::Balanced
        );
    }

    #[test]
    fn test_strategy_table_late_game() {
        assert_eq!(
            OpponentAi::select_strategy(600, frac(0.6), frac(0.6)),
            AiStrategy::Economic
        );
        assert_eq!(
            OpponentAi::select_strategy(600, frac(0.6), frac(0.2)),
            AiStrategy::Defensive
        );
        assert_eq!(
            OpponentAi::select_strategy(600, frac(0.4), frac(0.6)),
            AiStrategy::Aggressive
        );
    }

    #[test]
    fn test_timers_reset_after_firing() {
        let mut ai = OpponentAi::new(600, 40);
        let mut economy = SideEconomy::new(0, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let obs = observation(90, 1.0, 1.0, 10);

        // Strategy timer fires at 600 and flips Balanced -> Rush
        let outcome = ai.tick(600, obs, &mut economy, &mut rng);
        assert_eq!(outcome.strategy_changed, Some(AiStrategy::Rush));

        // Immediately after, neither timer is due
        let outcome = ai.tick(601, obs, &mut economy, &mut rng);
        assert!(outcome.strategy_changed.is_none());
        assert!(outcome.purchase.is_none());
    }

    #[test]
    fn test_rush_buys_cheap_tiers() {
        let mut ai = OpponentAi::new(10_000, 1);
        ai.strategy = AiStrategy::Rush;
        let mut economy = SideEconomy::new(100_000, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut bought = Vec::new();
        for now in 1..=2000 {
            let outcome = ai.tick(now, observation(30, 1.0, 1.0, 10), &mut economy, &mut rng);
            if let Some((kind, _)) = outcome.purchase {
                bought.push(kind);
            }
        }

        assert!(!bought.is_empty());
        assert!(bought
            .iter()
            .all(|k| matches!(k, UpgradeKind::MeleeTier | UpgradeKind::RangedTier)));
    }

    #[test]
    fn test_aggressive_needs_100_gold() {
        let mut ai = OpponentAi::new(10_000, 1);
        ai.strategy = AiStrategy::Aggressive;
        let mut economy = SideEconomy::new(99, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for now in 1..=1000 {
            let outcome = ai.tick(now, observation(200, 0.5, 1.0, 10), &mut economy, &mut rng);
            assert!(outcome.purchase.is_none());
        }
        assert_eq!(economy.gold, 99);
    }

    #[test]
    fn test_economic_biases_income() {
        let mut ai = OpponentAi::new(10_000, 1);
        ai.strategy = AiStrategy::Economic;
        let mut economy = SideEconomy::new(1_000_000, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let mut income = 0usize;
        let mut other = 0usize;
        for now in 1..=4000 {
            let outcome = ai.tick(now, observation(600, 1.0, 1.0, 10), &mut economy, &mut rng);
            match outcome.purchase {
                Some((UpgradeKind::Income, _)) => income += 1,
                Some(_) => other += 1,
                None => {}
            }
        }

        // Tracks cap at level 5, so compare first picks loosely: the income
        // track fills before the tier tracks do.
        assert!(income > 0);
        assert!(income + other <= 15);
    }

    #[test]
    fn test_effectiveness_formulas() {
        let mut ai = OpponentAi::new(1, 1);

        ai.strategy = AiStrategy::Aggressive;
        assert_eq!(ai.effectiveness(observation(300, 0.25, 1.0, 10)), 75);

        ai.strategy = AiStrategy::Defensive;
        assert_eq!(ai.effectiveness(observation(300, 1.0, 0.4, 10)), 40);

        ai.strategy = AiStrategy::Balanced;
        assert_eq!(ai.effectiveness(observation(300, 0.5, 0.5, 10)), 50);

        ai.strategy = AiStrategy::Economic;
        assert_eq!(ai.effectiveness(observation(300, 1.0, 1.0, 10)), 50);
        // Clamped at 100
        assert_eq!(ai.effectiveness(observation(300, 1.0, 1.0, 1000)), 100);

        ai.strategy = AiStrategy::Rush;
        assert_eq!(ai.effectiveness(observation(90, 1.0, 1.0, 10)), 100);
        assert_eq!(ai.effectiveness(observation(200, 1.0, 1.0, 10)), 50);
    }
}
