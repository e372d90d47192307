//! Unit data and the state machine it moves through.
//!
//! Units are pure data; the per-tick logic that drives them lives in
//! [`crate::systems`]. A unit is created once per pool slot and re-initialized
//! on every spawn via [`Unit::activate`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::pool::UnitHandle;

/// Which side of the lane a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The human player's side.
    Player,
    /// The automated opponent's side.
    Enemy,
}

impl Side {
    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Combat role of a unit, also the tier track it upgrades along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitKind {
    /// Close-range bruisers.
    #[default]
    Melee,
    /// Long-range attackers.
    Ranged,
    /// Slow, high-damage base crackers.
    Siege,
}

/// The unit state machine.
///
/// `Dead` and `ReachedBase` are terminal; entering either releases the
/// unit's pool slot and removes it from its lane roster exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnitState {
    /// Advancing along the waypoint sequence.
    #[default]
    Moving,
    /// Engaged with a target; movement is paused.
    Attacking,
    /// Health reached zero.
    Dead,
    /// Walked past the final waypoint and struck the opposing base.
    ReachedBase,
}

impl UnitState {
    /// Check whether this state ends the unit's lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dead | Self::ReachedBase)
    }
}

/// Stat block shared by every combat unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health points.
    pub max_health: i32,
    /// Damage per attack, also dealt to the opposing base on arrival.
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
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: 100,
            damage: 20,
            attack_range: Fixed::from_num(1),
            attack_speed: Fixed::from_num(1),
            move_speed: Fixed::from_num(3),
        }
    }
}

/// A pooled combat unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Combat role.
    pub kind: UnitKind,
    /// Side this unit fights for.
    pub side: Side,
    /// Index of the owning lane. The lane owns the roster; this is only a
    /// back-reference for lookups, never ownership.
    pub lane: usize,
    /// Stat block resolved at spawn time (tier scaling already applied).
    pub stats: UnitStats,
    /// Current health. Never observed negative on a live unit.
    pub current_health: i32,
    /// Temporary damage bonus from buffs.
    pub bonus_damage: i32,
    /// Current position in lane space.
    pub position: Vec2Fixed,
    /// Waypoints from this unit's spawn toward the opposing base.
    pub waypoints: Vec<Vec2Fixed>,
    /// Cursor into `waypoints`; monotone while the unit lives.
    pub waypoint_index: usize,
    /// Player-controlled units (the hero) hold position instead of
    /// advancing along the waypoints, but still engage enemies in range.
    pub controlled: bool,
    /// Current attack target, if any. Weak handle resolved through the pool.
    pub target: Option<UnitHandle>,
    /// State machine position.
    pub state: UnitState,
    /// Tick of the last attack; the first attack lands one full cooldown
    /// after spawn.
    pub last_attack_tick: u64,
}

impl Unit {
    /// Construct an empty slot occupant.
    ///
    /// Called once at pool allocation; every spawn re-initializes the
    /// instance with [`activate`](Self::activate).
    #[must_use]
    pub fn vacant() -> Self {
        Self {
            kind: UnitKind::Melee,
            side: Side::Player,
            lane: 0,
            stats: UnitStats::default(),
            current_health: 0,
            bonus_damage: 0,
            position: Vec2Fixed::ZERO,
            waypoints: Vec::new(),
            waypoint_index: 0,
            controlled: false,
            target: None,
            state: UnitState::Dead,
            last_attack_tick: 0,
        }
    }

    /// Re-initialize this instance for a fresh spawn.
    ///
    /// `waypoints` must already be ordered from this unit's spawn point
    /// toward the opposing base.
    pub fn activate(
        &mut self,
        kind: UnitKind,
        side: Side,
        lane: usize,
        stats: UnitStats,
        position: Vec2Fixed,
        waypoints: Vec<Vec2Fixed>,
        now: u64,
    ) {
        self.kind = kind;
        self.side = side;
        self.lane = lane;
        self.stats = stats;
        self.current_health = stats.max_health;
        self.bonus_damage = 0;
        self.position = position;
        self.waypoints = waypoints;
        self.waypoint_index = 0;
        self.controlled = false;
        self.target = None;
        self.state = UnitState::Moving;
        self.last_attack_tick = now;
    }

    /// Check if the unit is alive (not in a terminal state).
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.current_health > 0 && !self.state.is_terminal()
    }

    /// Effective attack damage including buffs.
    #[must_use]
    pub const fn attack_damage(&self) -> i32 {
        self.stats.damage + self.bonus_damage
    }

    /// Apply incoming damage.
    ///
    /// The death transition is synchronous with the health check: when this
    /// returns `true` the unit is already in [`UnitState::Dead`] with health
    /// clamped to zero.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.current_health -= amount;
        if self.current_health <= 0 {
            self.current_health = 0;
            self.state = UnitState::Dead;
            return true;
        }
        false
    }

    /// Restore health up to the stat-block maximum.
    pub fn heal(&mut self, amount: i32) {
        if self.is_alive() {
            self.current_health = (self.current_health + amount).min(self.stats.max_health);
        }
    }

    /// Attack cooldown in ticks, derived from attacks-per-second.
    #[must_use]
    pub fn attack_cooldown_ticks(&self, tick_rate: u32) -> u64 {
        if self.stats.attack_speed <= Fixed::ZERO {
            return u64::MAX;
        }
        let ticks = Fixed::from_num(tick_rate) / self.stats.attack_speed;
        let ticks: u64 = ticks.round().to_num();
        ticks.max(1)
    }

    /// Check if the cooldown has elapsed at `now`.
    #[must_use]
    pub fn attack_ready(&self, now: u64, tick_rate: u32) -> bool {
        now.saturating_sub(self.last_attack_tick) >= self.attack_cooldown_ticks(tick_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_unit() -> Unit {
        let mut unit = Unit::vacant();
        unit.activate(
            UnitKind::Melee,
            Side::Player,
            0,
            UnitStats::default(),
            Vec2Fixed::ZERO,
            vec![Vec2Fixed::ZERO],
            0,
        );
        unit
    }

    #[test]
    fn test_activate_resets_state() {
        let mut unit = live_unit();
        unit.take_damage(1000);
        assert_eq!(unit.state, UnitState::Dead);

        unit.activate(
            UnitKind::Ranged,
            Side::Enemy,
            0,
            UnitStats::default(),
            Vec2Fixed::ZERO,
            vec![],
            42,
        );
        assert!(unit.is_alive());
        assert_eq!(unit.state, UnitState::Moving);
        assert_eq!(unit.current_health, unit.stats.max_health);
        assert_eq!(unit.last_attack_tick, 42);
        assert_eq!(unit.bonus_damage, 0);
    }

    #[test]
    fn test_death_is_synchronous_and_clamped() {
        let mut unit = live_unit();
        let died = unit.take_damage(unit.stats.max_health + 55);

        assert!(died);
        assert_eq!(unit.current_health, 0);
        assert_eq!(unit.state, UnitState::Dead);
        assert!(!unit.is_alive());
    }

    #[test]
    fn test_partial_damage_keeps_moving() {
        let mut unit = live_unit();
        let died = unit.take_damage(10);

        assert!(!died);
        assert_eq!(unit.current_health, unit.stats.max_health - 10);
        assert_eq!(unit.state, UnitState::Moving);
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut unit = live_unit();
        unit.take_damage(30);
        unit.heal(1000);
        assert_eq!(unit.current_health, unit.stats.max_health);
    }

    #[test]
    fn test_attack_cooldown_from_speed() {
        let mut unit = live_unit();
        assert_eq!(unit.attack_cooldown_ticks(20), 20);

        unit.stats.attack_speed = Fixed::from_num(2);
        assert_eq!(unit.attack_cooldown_ticks(20), 10);

        unit.stats.attack_speed = Fixed::ZERO;
        assert_eq!(unit.attack_cooldown_ticks(20), u64::MAX);
    }

    #[test]
    fn test_first_attack_waits_full_cooldown() {
        let unit = live_unit();
        assert!(!unit.attack_ready(0, 20));
        assert!(!unit.attack_ready(19, 20));
        assert!(unit.attack_ready(20, 20));
    }

    #[test]
    fn test_buffed_damage() {
        let mut unit = live_unit();
        unit.bonus_damage = 10;
        assert_eq!(unit.attack_damage(), unit.stats.damage + 10);
    }
}
