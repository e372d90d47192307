//! Lanes and the spawn scheduler.
//!
//! A lane is a single path between two bases: spawn points at either end,
//! an evenly interpolated waypoint sequence shared by both sides (the enemy
//! side traverses it reversed), and the roster of currently active units.
//! The scheduler owns the lanes, ticks their spawn timers, and requests
//! units from the pool when a timer expires.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{FactionId, UnitRegistry};
use crate::economy::Economy;
use crate::math::{Fixed, Vec2Fixed};
use crate::pool::{UnitHandle, UnitPool};
use crate::units::{Side, UnitKind};

/// Vertical spacing between lanes.
const LANE_SPACING: i32 = 10;

/// Spawn point distance from lane center along the x axis.
const SPAWN_OFFSET: i32 = 20;

/// Base anchor distance from lane center along the x axis.
const BASE_OFFSET: i32 = 25;

/// Number of waypoints interpolated between the spawn points.
const WAYPOINT_COUNT: usize = 5;

/// Spawn configuration exposed to collaborators, mutable at setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Faction fielding the player side.
    pub player_faction: FactionId,
    /// Faction fielding the enemy side.
    pub enemy_faction: FactionId,
    /// Ordered unit kinds the player side can field. Empty disables spawns.
    pub player_kinds: Vec<UnitKind>,
    /// Ordered unit kinds the enemy side can field. Empty disables spawns.
    pub enemy_kinds: Vec<UnitKind>,
    /// Ticks between spawn waves.
    pub spawn_interval_ticks: u64,
}

impl SpawnConfig {
    /// Faction for a side.
    #[must_use]
    pub const fn faction(&self, side: Side) -> FactionId {
        match side {
            Side::Player => self.player_faction,
            Side::Enemy => self.enemy_faction,
        }
    }

    /// Configured unit kinds for a side.
    #[must_use]
    pub fn kinds(&self, side: Side) -> &[UnitKind] {
        match side {
            Side::Player => &self.player_kinds,
            Side::Enemy => &self.enemy_kinds,
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            player_faction: FactionId::Vanguard,
            enemy_faction: FactionId::Warband,
            player_kinds: vec![UnitKind::Melee, UnitKind::Ranged, UnitKind::Siege],
            enemy_kinds: vec![UnitKind::Melee, UnitKind::Ranged, UnitKind::Siege],
            spawn_interval_ticks: 100,
        }
    }
}

/// A unit spawned by the scheduler this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnedUnit {
    /// Pool handle of the new unit.
    pub handle: UnitHandle,
    /// Side the unit fights for.
    pub side: Side,
    /// Lane the unit joined.
    pub lane: usize,
    /// Combat role.
    pub kind: UnitKind,
    /// Resolved spawn tier.
    pub tier: u8,
}

/// A single lane between the two bases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    /// Lane index.
    pub index: usize,
    /// Player-side spawn point.
    pub player_spawn: Vec2Fixed,
    /// Enemy-side spawn point.
    pub enemy_spawn: Vec2Fixed,
    /// Player base anchor.
    pub player_base: Vec2Fixed,
    /// Enemy base anchor.
    pub enemy_base: Vec2Fixed,
    /// Waypoints ordered from the player spawn toward the enemy spawn.
    pub waypoints: Vec<Vec2Fixed>,
    /// Ticks between spawn waves in this lane.
    pub spawn_interval: u64,
    /// Tick of the last spawn wave.
    pub last_spawn_tick: u64,
    /// Active unit roster. Membership is unique; insertion order is the
    /// deterministic processing order.
    pub roster: Vec<UnitHandle>,
}

impl Lane {
    /// Spawn point for a side.
    #[must_use]
    pub const fn spawn_point(&self, side: Side) -> Vec2Fixed {
        match side {
            Side::Player => self.player_spawn,
            Side::Enemy => self.enemy_spawn,
        }
    }

    /// Base anchor for a side.
    #[must_use]
    pub const fn base_anchor(&self, side: Side) -> Vec2Fixed {
        match side {
            Side::Player => self.player_base,
            Side::Enemy => self.enemy_base,
        }
    }

    /// The shared waypoint sequence ordered for a side's direction of
    /// travel: spawn point toward the opposing base.
    #[must_use]
    pub fn waypoints_for(&self, side: Side) -> Vec<Vec2Fixed> {
        match side {
            Side::Player => self.waypoints.clone(),
            Side::Enemy => self.waypoints.iter().rev().copied().collect(),
        }
    }

    /// Add a unit to the roster. Duplicate membership is refused.
    pub fn add_unit(&mut self, handle: UnitHandle) -> bool {
        if self.roster.contains(&handle) {
            return false;
        }
        self.roster.push(handle);
        true
    }

    /// Remove a unit from the roster. Returns whether it was present.
    pub fn remove_unit(&mut self, handle: UnitHandle) -> bool {
        let before = self.roster.len();
        self.roster.retain(|&h| h != handle);
        before != self.roster.len()
    }
}

/// Owns the lanes, ticks spawn timers, and requests units from the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneScheduler {
    lanes: Vec<Lane>,
    /// Spawn configuration. Mutable at setup.
    pub config: SpawnConfig,
}

impl LaneScheduler {
    /// Create a scheduler with no lanes yet.
    #[must_use]
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            lanes: Vec::new(),
            config,
        }
    }

    /// Build `count` lanes, each with spawn points, base anchors, and an
    /// evenly interpolated waypoint sequence between the spawn points.
    pub fn initialize_lanes(&mut self, count: usize) {
        self.lanes.clear();
        for index in 0..count {
            let y = Fixed::from_num(index as i32 * LANE_SPACING);
            let player_spawn = Vec2Fixed::new(Fixed::from_num(-SPAWN_OFFSET), y);
            let enemy_spawn = Vec2Fixed::new(Fixed::from_num(SPAWN_OFFSET), y);

            let mut waypoints = Vec::with_capacity(WAYPOINT_COUNT);
            for j in 0..WAYPOINT_COUNT {
                let t = Fixed::from_num(j as i32) / Fixed::from_num(WAYPOINT_COUNT as i32 - 1);
                waypoints.push(player_spawn.lerp(enemy_spawn, t));
            }

            self.lanes.push(Lane {
                index,
                player_spawn,
                enemy_spawn,
                player_base: Vec2Fixed::new(Fixed::from_num(-BASE_OFFSET), y),
                enemy_base: Vec2Fixed::new(Fixed::from_num(BASE_OFFSET), y),
                waypoints,
                spawn_interval: self.config.spawn_interval_ticks,
                last_spawn_tick: 0,
                roster: Vec::new(),
            });
        }
    }

    /// Look up a lane by index.
    #[must_use]
    pub fn lane(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(index)
    }

    /// Mutable lane lookup.
    pub fn lane_mut(&mut self, index: usize) -> Option<&mut Lane> {
        self.lanes.get_mut(index)
    }

    /// All lanes.
    #[must_use]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Units in a lane. Empty for invalid indices.
    #[must_use]
    pub fn units_in_lane(&self, index: usize) -> &[UnitHandle] {
        self.lanes.get(index).map_or(&[], |lane| lane.roster.as_slice())
    }

    /// Base anchor lookup. `None` for invalid indices.
    #[must_use]
    pub fn base_anchor(&self, index: usize, side: Side) -> Option<Vec2Fixed> {
        self.lanes.get(index).map(|lane| lane.base_anchor(side))
    }

    /// Remove a unit from a lane's roster.
    ///
    /// Called exactly once per unit terminal transition.
    pub fn remove_unit(&mut self, lane_index: usize, handle: UnitHandle) {
        if let Some(lane) = self.lanes.get_mut(lane_index) {
            lane.remove_unit(handle);
        }
    }

    /// Tick spawn timers and spawn due waves.
    ///
    /// For every lane whose interval has elapsed, one unit spawns per
    /// configured side (player first, then enemy) and the lane's last-spawn
    /// timestamp resets to `now`.
    pub fn tick_spawns(
        &mut self,
        now: u64,
        pool: &mut UnitPool,
        registry: &UnitRegistry,
        economy: &Economy,
        rng: &mut impl Rng,
    ) -> Vec<SpawnedUnit> {
        let mut spawned = Vec::new();
        let config = &self.config;

        for lane in &mut self.lanes {
            if now - lane.last_spawn_tick < lane.spawn_interval {
                continue;
            }

            for side in [Side::Player, Side::Enemy] {
                if let Some(event) =
                    Self::spawn_for_side(lane, config, side, now, pool, registry, economy, rng)
                {
                    spawned.push(event);
                }
            }
            lane.last_spawn_tick = now;
        }

        spawned
    }

    /// Spawn one unit for `side` in `lane`, if a prototype is configured.
    ///
    /// An empty kind list or an unresolvable prototype is a silent no-op.
    fn spawn_for_side(
        lane: &mut Lane,
        config: &SpawnConfig,
        side: Side,
        now: u64,
        pool: &mut UnitPool,
        registry: &UnitRegistry,
        economy: &Economy,
        rng: &mut impl Rng,
    ) -> Option<SpawnedUnit> {
        let kinds = config.kinds(side);
        if kinds.is_empty() {
            return None;
        }
        let kind = kinds[rng.gen_range(0..kinds.len())];

        let side_economy = economy.side(side);
        let tier = side_economy.unit_tier(kind);
        let scaling_level = side_economy.unit_scaling_level(kind);

        let prototype = registry.resolve(config.faction(side), kind, tier)?;
        let stats = registry.get(prototype)?.stats(scaling_level);

        let handle = pool.acquire(prototype);
        let position = lane.spawn_point(side);
        let waypoints = lane.waypoints_for(side);
        if let Some(unit) = pool.get_mut(handle) {
            unit.activate(kind, side, lane.index, stats, position, waypoints, now);
        }
        lane.add_unit(handle);

        tracing::debug!(?side, ?kind, tier, lane = lane.index, "spawned unit");
        Some(SpawnedUnit {
            handle,
            side,
            lane: lane.index,
            kind,
            tier,
        })
    }
}
