//! Per-tick snapshot of the live units in the `hecs` world.
//!
//! The snapshot is the only way the tactical layer sees units. Dead or despawned units are
//! simply absent, so a stale [`Entity`] handle resolves to `None` instead of to a recycled
//! slot (hecs handles carry a generation).

use std::collections::HashMap;

use engine_core::{planar_distance, Entity, Faction, Health, Transform, UnitProfile, Vec3, World};

/// Read-only view of one live unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitView {
    pub entity: Entity,
    pub position: Vec3,
    pub faction: Faction,
    pub profile: UnitProfile,
    pub health_fraction: f32,
}

/// All live units, ordered by entity id so iteration is deterministic.
#[derive(Debug, Default, Clone)]
pub struct UnitRegistry {
    units: Vec<UnitView>,
    index: HashMap<Entity, usize>,
}

impl UnitRegistry {
    /// Collect every entity carrying `Transform`, `Health`, `UnitProfile` and `Faction`
    /// that still has health left.
    pub fn snapshot(world: &World) -> Self {
        let mut query = world.query::<(&Transform, &Health, &UnitProfile, &Faction)>();
        let views = query
            .iter()
            .filter(|(_, (_, health, _, _))| !health.is_dead())
            .map(|(entity, (transform, health, profile, faction))| UnitView {
                entity,
                position: transform.position,
                faction: *faction,
                profile: *profile,
                health_fraction: health.percentage(),
            })
            .collect();
        Self::from_views(views)
    }

    pub fn from_views(mut units: Vec<UnitView>) -> Self {
        units.sort_by_key(|u| u.entity.to_bits());
        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.entity, i))
            .collect();
        Self { units, index }
    }

    pub fn get(&self, entity: Entity) -> Option<&UnitView> {
        self.index.get(&entity).map(|&i| &self.units[i])
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.get(entity).map(|u| u.position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitView> + '_ {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units hostile to `faction`.
    pub fn hostiles_of(&self, faction: Faction) -> impl Iterator<Item = &UnitView> + '_ {
        self.units
            .iter()
            .filter(move |u| u.faction.is_hostile_to(faction))
    }

    /// Units of `faction`.
    pub fn friendlies_of(&self, faction: Faction) -> impl Iterator<Item = &UnitView> + '_ {
        self.units.iter().filter(move |u| u.faction == faction)
    }

    /// Hostiles of `faction` within `radius` (XZ distance) of `center`.
    pub fn hostiles_near(
        &self,
        faction: Faction,
        center: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &UnitView> + '_ {
        self.hostiles_of(faction)
            .filter(move |u| planar_distance(u.position, center) <= radius)
    }
}
