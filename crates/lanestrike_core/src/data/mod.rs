//! Data-driven definitions: unit stat tables and faction rosters.
//!
//! These are thin configuration records consumed by the spawn and AI logic.
//! Builtin tables cover the three stock factions; scenario files can supply
//! replacements in RON via serde.

mod faction_data;
mod unit_data;

pub use faction_data::{FactionData, FactionId, HeroData};
pub use unit_data::UnitData;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pool::PrototypeId;
use crate::units::UnitKind;

/// Registry of every unit prototype available in a match.
///
/// Prototype IDs index into this registry and double as pool keys, so a
/// recycled slot is always reused for the same prototype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRegistry {
    units: Vec<UnitData>,
    by_key: HashMap<(FactionId, UnitKind, u8), PrototypeId>,
}

impl UnitRegistry {
    /// Build a registry from the given faction rosters.
    #[must_use]
    pub fn from_factions(factions: &[FactionData]) -> Self {
        let mut registry = Self::default();
        for faction in factions {
            for unit in faction.all_units() {
                let id = PrototypeId::new(registry.units.len() as u32);
                registry
                    .by_key
                    .insert((faction.faction, unit.kind, unit.tier), id);
                registry.units.push(unit.clone());
            }
        }
        registry
    }

    /// Look up a prototype definition by ID.
    #[must_use]
    pub fn get(&self, id: PrototypeId) -> Option<&UnitData> {
        self.units.get(id.0 as usize)
    }

    /// Resolve the prototype for a faction's unit of the given kind and tier.
    ///
    /// Returns `None` for tiers the faction does not field.
    #[must_use]
    pub fn resolve(&self, faction: FactionId, kind: UnitKind, tier: u8) -> Option<PrototypeId> {
        self.by_key.get(&(faction, kind, tier)).copied()
    }

    /// Number of registered prototypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
