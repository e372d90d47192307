//! Gold, income, and the upgrade tracks each side purchases along.
//!
//! Expected shortfalls (insufficient gold, max-level track) are silent
//! no-ops: [`SideEconomy::purchase`] simply returns `None` and callers may
//! re-check via [`SideEconomy::can_afford`].
//!
//! All calculations use integer math for deterministic simulation.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;
use crate::units::{Side, UnitKind};

/// Income added per Income Boost level.
pub const INCOME_BOOST_DELTA: i32 = 5;

/// Base health added per Base Defense level.
pub const BASE_DEFENSE_DELTA: i32 = 200;

/// The closed set of purchasable upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Raise gold income per interval.
    Income,
    /// Raise the melee spawn tier.
    MeleeTier,
    /// Raise the ranged spawn tier.
    RangedTier,
    /// Raise the siege spawn tier.
    SiegeTier,
    /// Reinforce the owning side's base.
    BaseDefense,
}

impl UpgradeKind {
    /// Every upgrade kind, in purchase-menu order.
    pub const ALL: [Self; 5] = [
        Self::Income,
        Self::MeleeTier,
        Self::RangedTier,
        Self::SiegeTier,
        Self::BaseDefense,
    ];

    /// The tier upgrade matching a unit kind.
    #[must_use]
    pub const fn for_unit(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Melee => Self::MeleeTier,
            UnitKind::Ranged => Self::RangedTier,
            UnitKind::Siege => Self::SiegeTier,
        }
    }

    /// Gold cost at level zero.
    #[must_use]
    const fn base_cost(self) -> i32 {
        match self {
            Self::Income => 50,
            Self::MeleeTier | Self::RangedTier => 75,
            Self::SiegeTier => 100,
            Self::BaseDefense => 150,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Income => 0,
            Self::MeleeTier => 1,
            Self::RangedTier => 2,
            Self::SiegeTier => 3,
            Self::BaseDefense => 4,
        }
    }
}

/// The effect a completed purchase has on the wider simulation.
///
/// Income is applied by the economy itself; the other effects are carried
/// out by the caller (base health lives on the simulation, spawn tiers are
/// consulted lazily by the scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Income was raised by the contained delta.
    IncomeBoost(i32),
    /// The owning side's base gains the contained health.
    BaseReinforce(i32),
    /// A unit tier track reached the contained level.
    TierRaised(UnitKind, u8),
}

/// One upgrade's purchase track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeTrack {
    /// Current level.
    pub level: u8,
    /// Maximum purchasable level.
    pub max_level: u8,
    /// Gold cost of the next purchase.
    pub cost: i32,
}

impl UpgradeTrack {
    /// Default level cap.
    pub const DEFAULT_MAX_LEVEL: u8 = 5;

    /// Cost growth per purchase.
    fn multiplier() -> Fixed {
        Fixed::from_num(1.5)
    }

    /// Create a track at level zero with the given base cost.
    #[must_use]
    pub const fn new(cost: i32) -> Self {
        Self {
            level: 0,
            max_level: Self::DEFAULT_MAX_LEVEL,
            cost,
        }
    }

    /// Check whether another level can be purchased.
    #[must_use]
    pub const fn at_cap(&self) -> bool {
        self.level >= self.max_level
    }

    /// Advance one level and grow the next cost by the fixed multiplier.
    fn advance(&mut self) {
        self.level += 1;
        let next = Fixed::from_num(self.cost) * Self::multiplier();
        self.cost = next.round().to_num();
    }
}

/// One side's economy: gold, income, and upgrade tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideEconomy {
    /// Current gold balance. Never negative.
    pub gold: i32,
    /// Gold earned per income interval.
    pub income: i32,
    tracks: [UpgradeTrack; 5],
}

impl SideEconomy {
    /// Create an economy with starting gold and income.
    #[must_use]
    pub fn new(gold: i32, income: i32) -> Self {
        let tracks = [
            UpgradeTrack::new(UpgradeKind::Income.base_cost()),
            UpgradeTrack::new(UpgradeKind::MeleeTier.base_cost()),
            UpgradeTrack::new(UpgradeKind::RangedTier.base_cost()),
            UpgradeTrack::new(UpgradeKind::SiegeTier.base_cost()),
            UpgradeTrack::new(UpgradeKind::BaseDefense.base_cost()),
        ];
        Self {
            gold,
            income,
            tracks,
        }
    }

    /// The purchase track for an upgrade kind.
    #[must_use]
    pub fn track(&self, kind: UpgradeKind) -> &UpgradeTrack {
        &self.tracks[kind.index()]
    }

    /// Current level of an upgrade kind.
    #[must_use]
    pub fn upgrade_level(&self, kind: UpgradeKind) -> u8 {
        self.track(kind).level
    }

    /// Check whether the next level of `kind` is affordable right now.
    #[must_use]
    pub fn can_afford(&self, kind: UpgradeKind) -> bool {
        let track = self.track(kind);
        !track.at_cap() && self.gold >= track.cost
    }

    /// Spawn tier for a unit kind: tier 1 plus the track level, capped at
    /// the deepest roster tier.
    #[must_use]
    pub fn unit_tier(&self, kind: UnitKind) -> u8 {
        (1 + self.upgrade_level(UpgradeKind::for_unit(kind))).min(3)
    }

    /// Upgrade level consulted for stat scaling when spawning `kind`.
    #[must_use]
    pub fn unit_scaling_level(&self, kind: UnitKind) -> u8 {
        self.upgrade_level(UpgradeKind::for_unit(kind))
    }

    /// Attempt a purchase.
    ///
    /// Debits gold, raises the level, grows the next cost by the fixed
    /// multiplier, and reports the effect. Insufficient gold or a capped
    /// track is a silent no-op returning `None`.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Option<UpgradeEffect> {
        let track = &mut self.tracks[kind.index()];
        if track.at_cap() || self.gold < track.cost {
            return None;
        }

        self.gold -= track.cost;
        track.advance();
        let level = track.level;

        let effect = match kind {
            UpgradeKind::Income => {
                self.income += INCOME_BOOST_DELTA;
                UpgradeEffect::IncomeBoost(INCOME_BOOST_DELTA)
            }
            UpgradeKind::BaseDefense => UpgradeEffect::BaseReinforce(BASE_DEFENSE_DELTA),
            UpgradeKind::MeleeTier => UpgradeEffect::TierRaised(UnitKind::Melee, level),
            UpgradeKind::RangedTier => UpgradeEffect::TierRaised(UnitKind::Ranged, level),
            UpgradeKind::SiegeTier => UpgradeEffect::TierRaised(UnitKind::Siege, level),
        };
        tracing::info!(?kind, level, remaining_gold = self.gold, "upgrade purchased");
        Some(effect)
    }

    /// Collect one interval's income.
    pub fn collect_income(&mut self) {
        self.gold += self.income;
    }

    /// Add gold (kill rewards, refunds).
    pub fn add_gold(&mut self, amount: i32) {
        self.gold += amount;
    }

    /// Spend gold if available. Returns whether the debit happened.
    pub fn spend(&mut self, amount: i32) -> bool {
        if self.gold >= amount {
            self.gold -= amount;
            true
        } else {
            false
        }
    }
}

impl Default for SideEconomy {
    fn default() -> Self {
        Self::new(100, 10)
    }
}

/// Both sides' economies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Economy {
    /// The player side.
    pub player: SideEconomy,
    /// The opponent side.
    pub enemy: SideEconomy,
}

impl Economy {
    /// Borrow one side's economy.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideEconomy {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    /// Mutably borrow one side's economy.
    pub fn side_mut(&mut self, side: Side) -> &mut SideEconomy {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// Collect one interval's income for both sides.
    pub fn collect_income(&mut self) {
        self.player.collect_income();
        self.enemy.collect_income();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_cost_growth() {
        let mut economy = SideEconomy::new(10_000, 10);

        assert_eq!(economy.track(UpgradeKind::Income).cost, 50);
        economy.purchase(UpgradeKind::Income).unwrap();
        assert_eq!(economy.track(UpgradeKind::Income).cost, 75);
        economy.purchase(UpgradeKind::Income).unwrap();
        // round(75 * 1.5) = round(112.5) = 113
        assert_eq!(economy.track(UpgradeKind::Income).cost, 113);
    }

    #[test]
    fn test_insufficient_gold_is_noop() {
        let mut economy = SideEconomy::new(10, 10);
        assert!(!economy.can_afford(UpgradeKind::Income));
        assert!(economy.purchase(UpgradeKind::Income).is_none());
        assert_eq!(economy.gold, 10);
        assert_eq!(economy.upgrade_level(UpgradeKind::Income), 0);
    }

    #[test]
    fn test_max_level_is_noop() {
        let mut economy = SideEconomy::new(1_000_000, 10);
        for _ in 0..UpgradeTrack::DEFAULT_MAX_LEVEL {
            assert!(economy.purchase(UpgradeKind::MeleeTier).is_some());
        }
        assert!(economy.track(UpgradeKind::MeleeTier).at_cap());
        assert!(!economy.can_afford(UpgradeKind::MeleeTier));

        let gold_before = economy.gold;
        assert!(economy.purchase(UpgradeKind::MeleeTier).is_none());
        assert_eq!(economy.gold, gold_before);
    }

    #[test]
    fn test_income_purchase_applies_delta() {
        let mut economy = SideEconomy::new(1000, 10);
        let effect = economy.purchase(UpgradeKind::Income).unwrap();
        assert_eq!(effect, UpgradeEffect::IncomeBoost(INCOME_BOOST_DELTA));
        assert_eq!(economy.income, 15);

        economy.collect_income();
        assert_eq!(economy.gold, 1000 - 50 + 15);
    }

    #[test]
    fn test_base_defense_effect_is_deferred() {
        let mut economy = SideEconomy::new(1000, 10);
        let effect = economy.purchase(UpgradeKind::BaseDefense).unwrap();
        assert_eq!(effect, UpgradeEffect::BaseReinforce(BASE_DEFENSE_DELTA));
    }

    #[test]
    fn test_unit_tier_caps_at_three() {
        let mut economy = SideEconomy::new(1_000_000, 10);
        assert_eq!(economy.unit_tier(UnitKind::Melee), 1);

        for _ in 0..5 {
            economy.purchase(UpgradeKind::MeleeTier);
        }
        assert_eq!(economy.upgrade_level(UpgradeKind::MeleeTier), 5);
        assert_eq!(economy.unit_tier(UnitKind::Melee), 3);
        assert_eq!(economy.unit_scaling_level(UnitKind::Melee), 5);
    }

    #[test]
    fn test_spend_guard() {
        let mut economy = SideEconomy::new(30, 10);
        assert!(economy.spend(30));
        assert!(!economy.spend(1));
        assert_eq!(economy.gold, 0);
    }
}
