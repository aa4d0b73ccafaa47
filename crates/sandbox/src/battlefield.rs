//! Procedural map, its collision world, and the two opposing forces.

use engine_core::{Entity, Faction, Health, Transform, UnitKind, UnitProfile, Vec3, World};
use physics::PhysicsWorld;
use procgen::{scatter_cover, CoverScatterConfig, Heightmap, HeightmapConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tactics::{SquadId, SquadRole, TacticalDirector, TacticsError};

use crate::config::SandboxConfig;

pub struct Battlefield {
    pub map: Heightmap,
    pub physics: PhysicsWorld,
}

impl Battlefield {
    /// Generate terrain and cover and load both into the collision world.
    pub fn generate(config: &SandboxConfig) -> Self {
        let map = Heightmap::generate(HeightmapConfig {
            size: config.map_size,
            resolution: config.resolution,
            height_scale: config.height_scale,
            seed: config.seed,
            ..Default::default()
        });
        let cover = scatter_cover(
            &map,
            &CoverScatterConfig {
                count: config.cover_count,
                seed: config.seed.wrapping_add(1),
                ..Default::default()
            },
        );

        let mut physics = PhysicsWorld::new();
        let res = map.resolution();
        physics.add_terrain_heightfield(&map.heights, res, res, config.map_size, config.map_size);
        for obstacle in &cover {
            physics.add_cover_block(obstacle.center, obstacle.yaw, obstacle.half_extents);
        }
        physics.update_query_pipeline();
        log::info!(
            "battlefield {}x{} with {} cover obstacles ({} colliders)",
            config.map_size,
            config.map_size,
            cover.len(),
            physics.collider_count()
        );

        Self { map, physics }
    }

    pub fn ground(&self, position: Vec3) -> Vec3 {
        self.map.surface_point(position.x, position.z)
    }
}

const ROLES: [(SquadRole, UnitKind); 5] = [
    (SquadRole::Assault, UnitKind::Infantry),
    (SquadRole::Flanker, UnitKind::Infantry),
    (SquadRole::Support, UnitKind::Ranged),
    (SquadRole::Scout, UnitKind::Infantry),
    (SquadRole::Artillery, UnitKind::Artillery),
];

/// Spawn one squad per role for `faction` around `anchor`, plus a bunker.
pub fn spawn_force(
    units: &mut World,
    director: &mut TacticalDirector,
    field: &Battlefield,
    faction: Faction,
    anchor: Vec3,
    squad_size: usize,
    rng: &mut StdRng,
) -> Result<Vec<SquadId>, TacticsError> {
    let mut squads = Vec::with_capacity(ROLES.len());
    for (role, kind) in ROLES {
        let squad = director.create_squad_for(faction, role);
        for _ in 0..squad_size {
            let jitter = Vec3::new(rng.gen_range(-8.0..8.0), 0.0, rng.gen_range(-8.0..8.0));
            let unit = spawn_unit(units, field.ground(anchor + jitter), faction, kind);
            director.assign_unit_to_squad(unit, squad)?;
        }
        squads.push(squad);
    }
    spawn_unit(units, field.ground(anchor), faction, UnitKind::Bunker);
    Ok(squads)
}

fn spawn_unit(units: &mut World, position: Vec3, faction: Faction, kind: UnitKind) -> Entity {
    let max_health = match kind {
        UnitKind::Bunker => 400.0,
        UnitKind::Armor => 250.0,
        _ => 100.0,
    };
    units.spawn((
        Transform::from_position(position),
        Health::new(max_health),
        UnitProfile::for_kind(kind),
        faction,
    ))
}

pub fn spawn_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(2))
}
