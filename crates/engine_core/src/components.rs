//! Unit components stored in the `hecs` registry and read by the tactical layer.
//!
//! Unit variants are data, not types: behaviour differences between artillery, bunkers and
//! line infantry come from [`UnitKind`] lookups instead of per-type overrides.

use serde::{Deserialize, Serialize};

/// Health component for damageable units.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Remaining health in `0..=1`. A zero max counts as dead.
    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Side a unit or squad fights for. Units of different factions are hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Faction(pub u8);

impl Faction {
    pub fn is_hostile_to(self, other: Faction) -> bool {
        self != other
    }
}

/// Broad unit category used to key weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitKind {
    #[default]
    Infantry,
    /// Direct-fire ranged units.
    Ranged,
    Armor,
    /// Indirect-fire support; pairs with bunkers for shielding and resupply.
    Artillery,
    /// Static heavy defense; anchors artillery.
    Bunker,
    Air,
}

/// Combat capabilities of a unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitProfile {
    pub kind: UnitKind,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub airborne: bool,
}

impl UnitProfile {
    pub fn new(kind: UnitKind, attack_range: f32, attack_damage: f32) -> Self {
        Self {
            kind,
            attack_range,
            attack_damage,
            airborne: kind == UnitKind::Air,
        }
    }

    /// Baseline stats per kind.
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Infantry => Self::new(kind, 10.0, 10.0),
            UnitKind::Ranged => Self::new(kind, 25.0, 12.0),
            UnitKind::Armor => Self::new(kind, 18.0, 30.0),
            UnitKind::Artillery => Self::new(kind, 60.0, 40.0),
            UnitKind::Bunker => Self::new(kind, 30.0, 25.0),
            UnitKind::Air => Self::new(kind, 20.0, 15.0),
        }
    }
}

impl Default for UnitProfile {
    fn default() -> Self {
        Self::for_kind(UnitKind::Infantry)
    }
}
