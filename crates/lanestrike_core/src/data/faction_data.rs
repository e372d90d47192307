//! Faction definitions: tiered unit rosters, hero stats, starting economy.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::units::UnitKind;

use super::UnitData;

/// Unique identifier for factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionId {
    /// The Vanguard - disciplined line infantry and steady economy.
    Vanguard,
    /// The Warband - hard-hitting brutes with thin armor.
    Warband,
    /// The Revenant Court - fragile hordes backed by potent heroes.
    Revenant,
}

impl FactionId {
    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Vanguard => "The Vanguard",
            Self::Warband => "The Warband",
            Self::Revenant => "The Revenant Court",
        }
    }
}

/// Hero stat record for a faction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroData {
    /// Hero display name.
    pub name: String,
    /// Maximum health points.
    pub max_health: i32,
    /// Maximum mana points.
    pub max_mana: i32,
    /// Base attack damage.
    pub damage: i32,
}

/// Complete per-faction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionData {
    /// Faction identifier.
    pub faction: FactionId,
    /// Display name.
    pub name: String,
    /// Melee roster, one entry per tier.
    pub melee: Vec<UnitData>,
    /// Ranged roster, one entry per tier.
    pub ranged: Vec<UnitData>,
    /// Siege roster, one entry per tier.
    pub siege: Vec<UnitData>,
    /// Hero configuration.
    pub hero: HeroData,
    /// Starting base health.
    pub base_health: i32,
    /// Starting gold.
    pub starting_gold: i32,
    /// Starting income per interval.
    pub starting_income: i32,
}

impl FactionData {
    /// Look up a roster entry by kind and tier (1-based).
    ///
    /// Returns `None` for tiers outside the roster.
    #[must_use]
    pub fn unit_by_kind_and_tier(&self, kind: UnitKind, tier: u8) -> Option<&UnitData> {
        if tier < 1 {
            return None;
        }
        let roster = match kind {
            UnitKind::Melee => &self.melee,
            UnitKind::Ranged => &self.ranged,
            UnitKind::Siege => &self.siege,
        };
        roster.get(usize::from(tier) - 1)
    }

    /// Iterate over every unit in all rosters.
    pub fn all_units(&self) -> impl Iterator<Item = &UnitData> {
        self.melee
            .iter()
            .chain(self.ranged.iter())
            .chain(self.siege.iter())
    }

    /// Builtin roster for one of the stock factions.
    #[must_use]
    pub fn builtin(faction: FactionId) -> Self {
        // Per-faction flavor: Warband trades range for muscle, the Revenant
        // Court fields cheaper, frailer bodies.
        let (slug, health_bias, damage_bias) = match faction {
            FactionId::Vanguard => ("vanguard", 0, 0),
            FactionId::Warband => ("warband", 20, 4),
            FactionId::Revenant => ("revenant", -20, 2),
        };

        let melee_names = match faction {
            FactionId::Vanguard => ["Militia", "Man-at-Arms", "Justicar Blade"],
            FactionId::Warband => ["Grunt", "Berserker", "Warmonger"],
            FactionId::Revenant => ["Thrall", "Grave Knight", "Abhorrent"],
        };
        let ranged_names = match faction {
            FactionId::Vanguard => ["Archer", "Longbowman", "Arbalest"],
            FactionId::Warband => ["Axe Thrower", "Headhunter", "Spearcaller"],
            FactionId::Revenant => ["Bone Archer", "Banshee", "Dread Caller"],
        };
        let siege_names = match faction {
            FactionId::Vanguard => ["Ballista", "Catapult", "Siege Tower"],
            FactionId::Warband => ["Ram Crew", "Demolisher", "Earthshaker"],
            FactionId::Revenant => ["Plague Cart", "Flesh Titan", "Bone Colossus"],
        };

        let tiered = |names: [&str; 3], kind: UnitKind| -> Vec<UnitData> {
            let (health, damage, range, speed, attack_speed, cost) = match kind {
                UnitKind::Melee => (100, 20, 1.0, 3.0, 1.0, 50),
                UnitKind::Ranged => (70, 15, 4.0, 3.0, 1.2, 60),
                UnitKind::Siege => (150, 40, 2.0, 2.0, 0.5, 100),
            };
            names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let tier = i as u8 + 1;
                    // Each tier ships 25% more health and 20% more damage
                    let tier_health = scale_by_quarter(health + health_bias, i as u32);
                    let tier_damage = scale_by_fifth(damage + damage_bias, i as u32);
                    UnitData {
                        id: format!("{slug}_{}", name.to_lowercase().replace(' ', "_")),
                        name: (*name).to_string(),
                        kind,
                        tier,
                        max_health: tier_health,
                        damage: tier_damage,
                        attack_range: Fixed::from_num(range),
                        attack_speed: Fixed::from_num(attack_speed),
                        move_speed: Fixed::from_num(speed),
                        base_cost: cost + i as i32 * 25,
                        health_scaling: Fixed::from_num(1.2),
                        damage_scaling: Fixed::from_num(1.15),
                        cost_scaling: Fixed::from_num(1.5),
                    }
                })
                .collect()
        };

        let hero = match faction {
            FactionId::Vanguard => HeroData {
                name: "Justicar".to_string(),
                max_health: 250,
                max_mana: 120,
                damage: 35,
            },
            FactionId::Warband => HeroData {
                name: "Warchief".to_string(),
                max_health: 300,
                max_mana: 80,
                damage: 40,
            },
            FactionId::Revenant => HeroData {
                name: "Lichborn".to_string(),
                max_health: 180,
                max_mana: 150,
                damage: 25,
            },
        };

        Self {
            faction,
            name: faction.display_name().to_string(),
            melee: tiered(melee_names, UnitKind::Melee),
            ranged: tiered(ranged_names, UnitKind::Ranged),
            siege: tiered(siege_names, UnitKind::Siege),
            hero,
            base_health: 1000,
            starting_gold: 100,
            starting_income: 10,
        }
    }
}

/// `base * 1.25^steps`, rounded.
fn scale_by_quarter(base: i32, steps: u32) -> i32 {
    let mut value = Fixed::from_num(base);
    for _ in 0..steps {
        value *= Fixed::from_num(1.25);
    }
    value.round().to_num()
}

/// `base * 1.2^steps`, rounded.
fn scale_by_fifth(base: i32, steps: u32) -> i32 {
    let mut value = Fixed::from_num(base);
    for _ in 0..steps {
        value *= Fixed::from_num(1.2);
    }
    value.round().to_num()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rosters_have_three_tiers() {
        for faction in [FactionId::Vanguard, FactionId::Warband, FactionId::Revenant] {
            let data = FactionData::builtin(faction);
            assert_eq!(data.melee.len(), 3);
            assert_eq!(data.ranged.len(), 3);
            assert_eq!(data.siege.len(), 3);
            assert_eq!(data.all_units().count(), 9);
        }
    }

    #[test]
    fn test_tier_lookup_bounds() {
        let data = FactionData::builtin(FactionId::Vanguard);
        assert!(data.unit_by_kind_and_tier(UnitKind::Melee, 0).is_none());
        assert!(data.unit_by_kind_and_tier(UnitKind::Melee, 4).is_none());

        let tier2 = data.unit_by_kind_and_tier(UnitKind::Ranged, 2).unwrap();
        assert_eq!(tier2.tier, 2);
        assert_eq!(tier2.kind, UnitKind::Ranged);
    }

    #[test]
    fn test_tiers_grow_stronger() {
        let data = FactionData::builtin(FactionId::Warband);
        let t1 = data.unit_by_kind_and_tier(UnitKind::Melee, 1).unwrap();
        let t3 = data.unit_by_kind_and_tier(UnitKind::Melee, 3).unwrap();
        assert!(t3.max_health > t1.max_health);
        assert!(t3.damage > t1.damage);
        assert!(t3.base_cost > t1.base_cost);
    }

    #[test]
    fn test_ron_roundtrip() {
        let data = FactionData::builtin(FactionId::Revenant);
        let text = ron::to_string(&data).unwrap();
        let back: FactionData = ron::from_str(&text).unwrap();
        assert_eq!(back.faction, FactionId::Revenant);
        assert_eq!(back.all_units().count(), 9);
    }
}
