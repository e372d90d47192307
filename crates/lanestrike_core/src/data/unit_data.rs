//! Unit stat records.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};
use crate::units::{UnitKind, UnitStats};

/// Data-driven unit definition.
///
/// Defines the base stats of one prototype and how those stats scale with
/// the owning side's tier-upgrade level.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "vanguard_militia",
///     name: "Militia",
///     kind: Melee,
///     tier: 1,
///     max_health: 100,
///     damage: 20,
///     attack_range: 4294967296,   // Fixed-point for 1.0
///     attack_speed: 4294967296,   // Fixed-point for 1.0
///     move_speed: 12884901888,    // Fixed-point for 3.0
///     base_cost: 50,
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier for this prototype.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Combat role; also selects the upgrade track that scales this unit.
    pub kind: UnitKind,

    /// Tier within its kind (1-3).
    pub tier: u8,

    /// Base maximum health before upgrade scaling.
    pub max_health: i32,

    /// Base damage before upgrade scaling.
    pub damage: i32,

    /// Attack range in lane units.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,

    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,

    /// Movement speed in lane units per second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,

    /// Gold cost at upgrade level zero.
    pub base_cost: i32,

    /// Health multiplier applied per upgrade level.
    #[serde(default = "default_health_scaling", with = "fixed_serde")]
    pub health_scaling: Fixed,

    /// Damage multiplier applied per upgrade level.
    #[serde(default = "default_damage_scaling", with = "fixed_serde")]
    pub damage_scaling: Fixed,

    /// Cost multiplier applied per upgrade level.
    #[serde(default = "default_cost_scaling", with = "fixed_serde")]
    pub cost_scaling: Fixed,
}

fn default_health_scaling() -> Fixed {
    Fixed::from_num(1.2)
}

fn default_damage_scaling() -> Fixed {
    Fixed::from_num(1.15)
}

fn default_cost_scaling() -> Fixed {
    Fixed::from_num(1.5)
}

/// Apply `factor` to `base`, `level` times, rounding once at the end.
fn scaled(base: i32, factor: Fixed, level: u8) -> i32 {
    let mut value = Fixed::from_num(base);
    for _ in 0..level {
        value *= factor;
    }
    value.round().to_num()
}

impl UnitData {
    /// Health at the given upgrade level.
    #[must_use]
    pub fn upgraded_health(&self, level: u8) -> i32 {
        scaled(self.max_health, self.health_scaling, level)
    }

    /// Damage at the given upgrade level.
    #[must_use]
    pub fn upgraded_damage(&self, level: u8) -> i32 {
        scaled(self.damage, self.damage_scaling, level)
    }

    /// Gold cost at the given upgrade level.
    #[must_use]
    pub fn upgraded_cost(&self, level: u8) -> i32 {
        scaled(self.base_cost, self.cost_scaling, level)
    }

    /// Resolve the runtime stat block at the given upgrade level.
    #[must_use]
    pub fn stats(&self, level: u8) -> UnitStats {
        UnitStats {
            max_health: self.upgraded_health(level),
            damage: self.upgraded_damage(level),
            attack_range: self.attack_range,
            attack_speed: self.attack_speed,
            move_speed: self.move_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UnitData {
        UnitData {
            id: "test_grunt".to_string(),
            name: "Grunt".to_string(),
            kind: UnitKind::Melee,
            tier: 1,
            max_health: 100,
            damage: 20,
            attack_range: Fixed::from_num(1),
            attack_speed: Fixed::from_num(1),
            move_speed: Fixed::from_num(3),
            base_cost: 50,
            health_scaling: default_health_scaling(),
            damage_scaling: default_damage_scaling(),
            cost_scaling: default_cost_scaling(),
        }
    }

    #[test]
    fn test_level_zero_is_base() {
        let data = sample();
        let stats = data.stats(0);
        assert_eq!(stats.max_health, 100);
        assert_eq!(stats.damage, 20);
    }

    #[test]
    fn test_upgrade_scaling_rounds_to_nearest() {
        let data = sample();
        // 100 * 1.2 = 120, 100 * 1.2² = 144
        assert_eq!(data.upgraded_health(1), 120);
        assert_eq!(data.upgraded_health(2), 144);
        // 20 * 1.15 = 23
        assert_eq!(data.upgraded_damage(1), 23);
        // 50 * 1.5 = 75, 50 * 1.5² = 112.5 → 113
        assert_eq!(data.upgraded_cost(1), 75);
        assert_eq!(data.upgraded_cost(2), 113);
    }
}
