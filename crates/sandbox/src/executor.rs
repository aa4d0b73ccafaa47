//! Stand-in for the movement and combat layer: straight-line motion and flat attrition.

use std::collections::{HashMap, HashSet};

use engine_core::{
    flatten, planar_distance, Entity, Faction, Health, Transform, UnitProfile, Vec3, World,
};
use tactics::UnitController;

use crate::battlefield::Battlefield;

/// Fraction of a unit's attack damage dealt per second.
const DAMAGE_RATE: f32 = 0.5;

#[derive(Debug, Default)]
pub struct Executor {
    speed: f32,
    destinations: HashMap<Entity, Vec3>,
    holding_fire: HashSet<Entity>,
    priority: HashMap<Entity, Entity>,
    /// Damage reduction per unit, keyed by source.
    reductions: HashMap<Entity, HashMap<&'static str, f32>>,
    fortified: HashSet<Entity>,
}

impl UnitController for Executor {
    fn set_destination(&mut self, unit: Entity, position: Vec3) {
        self.destinations.insert(unit, position);
    }

    fn set_aggressive(&mut self, _unit: Entity, _aggressive: bool) {}

    fn enable_flanking(&mut self, _unit: Entity, _enable: bool) {}

    fn provide_support_fire(&mut self, _unit: Entity, _enable: bool) {}

    fn use_cover(&mut self, unit: Entity, position: Vec3) {
        self.destinations.insert(unit, position);
    }

    fn hold_fire(&mut self, unit: Entity, hold: bool) {
        if hold {
            self.holding_fire.insert(unit);
        } else {
            self.holding_fire.remove(&unit);
        }
    }

    fn fortify(&mut self, unit: Entity) {
        if self.fortified.insert(unit) {
            log::info!("bunker {:?} fortified", unit);
        }
    }

    fn set_priority_target(&mut self, unit: Entity, target: Entity, _airborne: bool) {
        self.priority.insert(unit, target);
    }

    fn apply_damage_reduction(&mut self, unit: Entity, source: &'static str, amount: f32) {
        let entry = self.reductions.entry(unit).or_default();
        if amount > 0.0 {
            entry.insert(source, amount);
        } else {
            entry.remove(source);
        }
    }
}

impl Executor {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    /// Move every unit towards its destination, keeping it on the ground.
    pub fn step_movement(&mut self, units: &mut World, field: &Battlefield, dt: f32) {
        let reach = self.speed * dt;
        for (entity, transform) in units.query_mut::<&mut Transform>() {
            let Some(&goal) = self.destinations.get(&entity) else {
                continue;
            };
            let offset = flatten(goal - transform.position);
            let distance = offset.length();
            if distance <= reach {
                transform.position = field.ground(goal);
                self.destinations.remove(&entity);
                continue;
            }
            let direction = offset / distance;
            transform.face_planar(direction);
            transform.position = field.ground(transform.position + direction * reach);
        }
    }

    /// Every armed unit damages its priority target, or else the nearest hostile in range.
    pub fn step_combat(&self, units: &mut World, dt: f32) {
        let mut shooters = Vec::new();
        for (entity, (transform, health, profile, faction)) in units
            .query::<(&Transform, &Health, &UnitProfile, &Faction)>()
            .iter()
        {
            if !health.is_dead() {
                shooters.push((entity, transform.position, *profile, *faction));
            }
        }

        let mut hits: Vec<(Entity, f32)> = Vec::new();
        for &(entity, position, profile, faction) in &shooters {
            if profile.attack_damage <= 0.0 || self.holding_fire.contains(&entity) {
                continue;
            }
            let in_range = |target: &&(Entity, Vec3, UnitProfile, Faction)| {
                target.3.is_hostile_to(faction)
                    && planar_distance(target.1, position) <= profile.attack_range
            };
            let preferred = self
                .priority
                .get(&entity)
                .and_then(|t| shooters.iter().find(|s| s.0 == *t))
                .filter(|s| in_range(s));
            let target = preferred.or_else(|| {
                shooters
                    .iter()
                    .filter(|s| in_range(s))
                    .min_by(|a, b| {
                        planar_distance(a.1, position).total_cmp(&planar_distance(b.1, position))
                    })
            });
            if let Some(target) = target {
                hits.push((target.0, profile.attack_damage * DAMAGE_RATE * dt));
            }
        }

        for (target, damage) in hits {
            let reduction: f32 = self
                .reductions
                .get(&target)
                .map_or(0.0, |r| r.values().copied().fold(0.0, f32::max));
            if let Ok(mut health) = units.get::<&mut Health>(target) {
                health.take_damage(damage * (1.0 - reduction));
            }
        }
    }

    /// Forget orders addressed to units that died.
    pub fn prune(&mut self, units: &World) {
        let alive = |e: &Entity| units.get::<&Health>(*e).map_or(false, |h| !h.is_dead());
        self.destinations.retain(|e, _| alive(e));
        self.priority.retain(|e, _| alive(e));
        self.holding_fire.retain(|e| alive(e));
    }
}
