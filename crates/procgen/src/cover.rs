//! Scattering of cover obstacles (boulders, walls, wrecks) over a heightmap.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::terrain::Heightmap;

/// A box-shaped obstacle resting on the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverObstacle {
    /// Centre of the box in world space.
    pub center: Vec3,
    /// Half sizes in local X, Y, Z.
    pub half_extents: Vec3,
    /// Rotation around Y in radians.
    pub yaw: f32,
}

/// Settings for [`scatter_cover`].
#[derive(Debug, Clone)]
pub struct CoverScatterConfig {
    pub count: usize,
    pub min_height: f32,
    pub max_height: f32,
    pub min_width: f32,
    pub max_width: f32,
    /// Obstacles are not placed below this height (keeps lakes clear).
    pub min_ground_height: f32,
    pub seed: u64,
}

impl Default for CoverScatterConfig {
    fn default() -> Self {
        Self {
            count: 120,
            min_height: 1.0,
            max_height: 3.5,
            min_width: 0.8,
            max_width: 4.0,
            min_ground_height: 0.5,
            seed: 0,
        }
    }
}

/// Place obstacles at random points of the map, seated on the ground.
pub fn scatter_cover(map: &Heightmap, config: &CoverScatterConfig) -> Vec<CoverObstacle> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let half = map.config.size / 2.0;
    let mut placed = Vec::with_capacity(config.count);
    // Bounded attempts so a drowned map cannot loop forever.
    let attempts = config.count * 8;

    for _ in 0..attempts {
        if placed.len() >= config.count {
            break;
        }
        let x = rng.gen_range(-half..half);
        let z = rng.gen_range(-half..half);
        let ground = map.sample_height(x, z);
        if ground < config.min_ground_height {
            continue;
        }
        let half_height = rng.gen_range(config.min_height..=config.max_height) * 0.5;
        let half_width = rng.gen_range(config.min_width..=config.max_width) * 0.5;
        let half_depth = rng.gen_range(config.min_width..=config.max_width) * 0.5;
        placed.push(CoverObstacle {
            center: Vec3::new(x, ground + half_height, z),
            half_extents: Vec3::new(half_width, half_height, half_depth),
            yaw: rng.gen_range(0.0..std::f32::consts::TAU),
        });
    }

    if placed.len() < config.count {
        log::warn!(
            "placed only {} of {} cover obstacles (too little dry ground)",
            placed.len(),
            config.count
        );
    }
    placed
}
