//! Per-tick unit state machine logic.
//!
//! These functions advance one unit through its move → engage → resolve
//! cycle. They mutate pool-owned units via copy-then-write-back so the
//! borrow of the arena never overlaps a roster scan.
//!
//! Terminal bookkeeping (roster removal, pool release, notifications) is
//! carried out by the simulation after each step, exactly once per unit.

use crate::math::{Fixed, Vec2Fixed};
use crate::pool::{UnitHandle, UnitPool};
use crate::units::{Side, UnitState};

/// Distance at which a waypoint counts as reached.
fn waypoint_reach_distance() -> Fixed {
    Fixed::from_num(1) / Fixed::from_num(2)
}

/// Outcome of stepping a single unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Set when this unit reached the opposing base: the damage to debit.
    pub arrived: Option<i32>,
    /// Set when this unit's attack killed its target this tick.
    pub killed: Option<UnitHandle>,
}

/// Find the strictly closest living opposing unit within `range`.
///
/// Ties on exact distance break toward the lowest slot index, so target
/// choice is stable regardless of roster order.
#[must_use]
pub fn acquire_target(
    pool: &UnitPool,
    roster: &[UnitHandle],
    attacker: UnitHandle,
    position: Vec2Fixed,
    side: Side,
    range: Fixed,
) -> Option<UnitHandle> {
    let range_sq = range * range;

    roster
        .iter()
        .filter(|&&handle| handle != attacker)
        .filter_map(|&handle| {
            let unit = pool.get(handle)?;
            if unit.side == side || !unit.is_alive() {
                return None;
            }
            let dist_sq = position.distance_squared(unit.position);
            (dist_sq <= range_sq).then_some((dist_sq.to_bits(), handle))
        })
        .min_by_key(|&(dist_bits, handle)| (dist_bits, handle.index))
        .map(|(_, handle)| handle)
}

/// Advance one unit through its state machine for this tick.
///
/// A unit does exactly one of: resolve its engagement, acquire a target, or
/// move. Movement pauses entirely while attacking. Stale handles and units
/// already dead this tick are skipped.
pub fn step_unit(
    pool: &mut UnitPool,
    roster: &[UnitHandle],
    handle: UnitHandle,
    now: u64,
    tick_rate: u32,
) -> StepResult {
    let mut result = StepResult::default();

    let Some(unit) = pool.get(handle) else {
        return result;
    };
    if !unit.is_alive() {
        return result;
    }

    let side = unit.side;
    let position = unit.position;
    let stats = unit.stats;
    let state = unit.state;
    let target = unit.target;
    let attack_ready = unit.attack_ready(now, tick_rate);
    let attack_damage = unit.attack_damage();
    let controlled = unit.controlled;
    let waypoint_index = unit.waypoint_index;
    let waypoint_count = unit.waypoints.len();
    let next_waypoint = unit.waypoints.get(waypoint_index).copied();

    match state {
        UnitState::Attacking => {
            // A dead or recycled target reads as "no target"
            let target_position = target
                .and_then(|t| pool.get(t))
                .filter(|t| t.is_alive())
                .map(|t| t.position);

            let (Some(target_handle), Some(target_position)) = (target, target_position) else {
                disengage(pool, handle);
                return result;
            };

            let range_sq = stats.attack_range * stats.attack_range;
            if position.distance_squared(target_position) > range_sq {
                // Target slipped out of range; resume movement next tick
                disengage(pool, handle);
                return result;
            }

            if attack_ready {
                let died = pool
                    .get_mut(target_handle)
                    .map(|t| t.take_damage(attack_damage))
                    .unwrap_or(false);

                if let Some(unit) = pool.get_mut(handle) {
                    unit.last_attack_tick = now;
                    if died {
                        unit.target = None;
                        unit.state = UnitState::Moving;
                    }
                }
                if died {
                    result.killed = Some(target_handle);
                }
            }
        }

        UnitState::Moving => {
            if let Some(found) =
                acquire_target(pool, roster, handle, position, side, stats.attack_range)
            {
                if let Some(unit) = pool.get_mut(handle) {
                    unit.target = Some(found);
                    unit.state = UnitState::Attacking;
                }
                return result;
            }

            // Controlled units hold position between engagements
            if controlled {
                return result;
            }

            // No enemy in range: advance along the waypoint sequence
            match next_waypoint {
                None => {
                    // Cursor is past the final waypoint while still alive
                    if let Some(unit) = pool.get_mut(handle) {
                        unit.state = UnitState::ReachedBase;
                    }
                    result.arrived = Some(attack_damage);
                }
                Some(waypoint) => {
                    let reach = waypoint_reach_distance();
                    if position.distance_squared(waypoint) <= reach * reach {
                        let arrived = waypoint_index + 1 >= waypoint_count;
                        if let Some(unit) = pool.get_mut(handle) {
                            unit.waypoint_index += 1;
                            if arrived {
                                unit.state = UnitState::ReachedBase;
                            }
                        }
                        if arrived {
                            result.arrived = Some(attack_damage);
                        }
                    } else {
                        let step = stats.move_speed / Fixed::from_num(tick_rate);
                        if let Some(unit) = pool.get_mut(handle) {
                            unit.position = position.step_toward(waypoint, step);
                        }
                    }
                }
            }
        }

        UnitState::Dead | UnitState::ReachedBase => {}
    }

    result
}

/// Drop the current target and resume movement.
fn disengage(pool: &mut UnitPool, handle: UnitHandle) {
    if let Some(unit) = pool.get_mut(handle) {
        unit.target = None;
        unit.state = UnitState::Moving;
    }
}
