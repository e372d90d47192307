//! The player hero: mana, experience, and a four-slot ability bar.
//!
//! The hero's body is an ordinary pooled unit in the lane roster; this
//! module holds the layer on top of it. Ability gating (index bounds,
//! cooldown, mana) follows the silent no-op rule: an invalid cast simply
//! does not happen, and callers can pre-check via [`Hero::can_use_ability`].
//!
//! Ability *effects* touch lane and pool state, so casting is split:
//! [`Hero::begin_cast`] validates and spends, and the simulation applies the
//! returned [`AbilityCast`].

use serde::{Deserialize, Serialize};

use crate::data::HeroData;
use crate::math::{fixed_serde, Fixed};
use crate::pool::UnitHandle;

/// Mana restored per second.
pub const MANA_REGEN_PER_SEC: i32 = 5;

/// Experience awarded when a damage ability lands.
pub const XP_PER_ABILITY_HIT: i32 = 10;

/// Seconds a damage buff stays on an allied unit.
pub const BUFF_DURATION_SECS: u64 = 10;

/// What an ability does when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Damage the nearest living enemy in the hero's lane.
    Damage,
    /// Restore the hero's health.
    Heal,
    /// Grant bonus damage to nearby allies for a fixed duration.
    Buff,
    /// Damage every enemy within range.
    AoE,
}

/// One ability slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    /// Display name.
    pub name: String,
    /// Cooldown in ticks.
    pub cooldown: u64,
    /// Mana cost per cast.
    pub mana_cost: i32,
    /// Effect range in lane units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Effect magnitude: damage dealt, health restored, or buff size.
    pub amount: i32,
    /// Effect category.
    pub kind: AbilityKind,
    /// Tick of the last cast, `None` before the first.
    pub last_use_tick: Option<u64>,
}

impl Ability {
    /// Check whether the cooldown has elapsed at `now`.
    #[must_use]
    pub fn ready(&self, now: u64) -> bool {
        match self.last_use_tick {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown,
        }
    }

    /// Remaining cooldown in ticks at `now`.
    #[must_use]
    pub fn remaining_cooldown(&self, now: u64) -> u64 {
        match self.last_use_tick {
            None => 0,
            Some(last) => self.cooldown.saturating_sub(now.saturating_sub(last)),
        }
    }
}

/// A validated cast, ready for the simulation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityCast {
    /// Effect category.
    pub kind: AbilityKind,
    /// Effect range.
    pub range: Fixed,
    /// Effect magnitude.
    pub amount: i32,
}

/// A temporary damage bonus on a unit, keyed by its pool handle.
///
/// Expiry resolves the handle through the pool; if the unit died or its slot
/// was recycled in the meantime, removal is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedBuff {
    /// Buffed unit.
    pub target: UnitHandle,
    /// Bonus damage granted.
    pub amount: i32,
    /// Tick at which the bonus is removed.
    pub expires_at: u64,
}

/// Hero progression and ability state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hero {
    /// Display name.
    pub name: String,
    /// Pool handle of the hero's unit, once spawned.
    pub handle: Option<UnitHandle>,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Current level, starting at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub experience: i32,
    /// Experience required for the next level.
    pub experience_to_next: i32,
    /// The four ability slots.
    pub abilities: Vec<Ability>,
}

impl Hero {
    /// Build a hero from faction data, with the stock ability bar.
    #[must_use]
    pub fn from_data(data: &HeroData, tick_rate: u32) -> Self {
        let second = u64::from(tick_rate);
        let attack_range = Fixed::from_num(2);

        let abilities = vec![
            Ability {
                name: "Strike".to_string(),
                cooldown: second,
                mana_cost: 0,
                range: attack_range,
                amount: data.damage,
                kind: AbilityKind::Damage,
                last_use_tick: None,
            },
            Ability {
                name: "Mend".to_string(),
                cooldown: 8 * second,
                mana_cost: 30,
                range: Fixed::from_num(5),
                amount: 50,
                kind: AbilityKind::Heal,
                last_use_tick: None,
            },
            Ability {
                name: "Power Strike".to_string(),
                cooldown: 12 * second,
                mana_cost: 40,
                range: attack_range,
                amount: data.damage * 2,
                kind: AbilityKind::Damage,
                last_use_tick: None,
            },
            Ability {
                name: "Battle Cry".to_string(),
                cooldown: 15 * second,
                mana_cost: 50,
                range: Fixed::from_num(8),
                amount: 10,
                kind: AbilityKind::Buff,
                last_use_tick: None,
            },
        ];

        Self {
            name: data.name.clone(),
            handle: None,
            mana: data.max_mana,
            max_mana: data.max_mana,
            level: 1,
            experience: 0,
            experience_to_next: 100,
            abilities,
        }
    }

    /// Check whether an ability can be cast right now.
    ///
    /// Out-of-range indices are `false`, never an error.
    #[must_use]
    pub fn can_use_ability(&self, index: usize, now: u64) -> bool {
        self.abilities
            .get(index)
            .is_some_and(|ability| ability.ready(now) && self.mana >= ability.mana_cost)
    }

    /// Validate and pay for a cast.
    ///
    /// Deducts mana and stamps the cooldown; the returned [`AbilityCast`]
    /// carries everything the simulation needs to apply the effect. Invalid
    /// index, unfinished cooldown, or insufficient mana are silent no-ops.
    pub fn begin_cast(&mut self, index: usize, now: u64) -> Option<AbilityCast> {
        if !self.can_use_ability(index, now) {
            return None;
        }
        let ability = &mut self.abilities[index];
        self.mana -= ability.mana_cost;
        ability.last_use_tick = Some(now);
        Some(AbilityCast {
            kind: ability.kind,
            range: ability.range,
            amount: ability.amount,
        })
    }

    /// Regenerate one second's worth of mana.
    pub fn regen_mana(&mut self) {
        self.mana = (self.mana + MANA_REGEN_PER_SEC).min(self.max_mana);
    }

    /// Award experience and resolve any level-ups.
    ///
    /// Each level raises max mana by 10 and refills it; the per-level health
    /// and damage gains apply to the hero's pooled unit, so the number of
    /// levels gained is returned for the caller to apply there.
    pub fn gain_experience(&mut self, amount: i32) -> u32 {
        self.experience += amount;

        let mut levels = 0;
        while self.experience >= self.experience_to_next {
            self.experience -= self.experience_to_next;
            self.level += 1;
            levels += 1;
            self.max_mana += 10;
            self.mana = self.max_mana;

            let next = Fixed::from_num(self.experience_to_next) * Fixed::from_num(1.2);
            self.experience_to_next = next.round().to_num();
            tracing::info!(name = %self.name, level = self.level, "hero level up");
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> Hero {
        Hero::from_data(
            &HeroData {
                name: "Justicar".to_string(),
                max_health: 250,
                max_mana: 120,
                damage: 35,
            },
            20,
        )
    }

    #[test]
    fn test_out_of_range_index_is_refused() {
        let mut hero = hero();
        assert!(!hero.can_use_ability(4, 100));
        assert!(hero.begin_cast(99, 100).is_none());
    }

    #[test]
    fn test_cast_spends_mana_and_starts_cooldown() {
        let mut hero = hero();
        let cast = hero.begin_cast(1, 100).unwrap();

        assert_eq!(cast.kind, AbilityKind::Heal);
        assert_eq!(hero.mana, 120 - 30);
        assert!(!hero.can_use_ability(1, 101));
        // 8 second cooldown at 20 ticks per second
        assert!(hero.can_use_ability(1, 100 + 160));
        assert_eq!(hero.abilities[1].remaining_cooldown(120), 140);
    }

    #[test]
    fn test_insufficient_mana_is_noop() {
        let mut hero = hero();
        hero.mana = 10;
        assert!(!hero.can_use_ability(3, 100));
        assert!(hero.begin_cast(3, 100).is_none());
        assert_eq!(hero.mana, 10);
    }

    #[test]
    fn test_free_ability_always_gated_by_cooldown_only() {
        let mut hero = hero();
        hero.mana = 0;
        assert!(hero.can_use_ability(0, 100));
        hero.begin_cast(0, 100).unwrap();
        assert!(!hero.can_use_ability(0, 110));
        assert!(hero.can_use_ability(0, 120));
    }

    #[test]
    fn test_mana_regen_clamps() {
        let mut hero = hero();
        hero.mana = 118;
        hero.regen_mana();
        assert_eq!(hero.mana, 120);
    }

    #[test]
    fn test_experience_levels_up_and_scales_threshold() {
        let mut hero = hero();

        let levels = hero.gain_experience(99);
        assert_eq!(levels, 0);
        assert_eq!(hero.level, 1);

        let levels = hero.gain_experience(1);
        assert_eq!(levels, 1);
        assert_eq!(hero.level, 2);
        assert_eq!(hero.experience, 0);
        assert_eq!(hero.experience_to_next, 120);
        assert_eq!(hero.max_mana, 130);
        assert_eq!(hero.mana, 130);

        // Enough for two more levels at once: 120 + 144
        let levels = hero.gain_experience(264);
        assert_eq!(levels, 2);
        assert_eq!(hero.level, 4);
    }
}
