//! Heightmap generation using noise functions.
//!
//! **Seed-based determinism:** all noise is derived from `config.seed`, so the same seed
//! always produces the same battlefield and skirmish runs are reproducible.

use glam::Vec3;
use noise::{NoiseFn, Perlin, Simplex};

/// Derive a deterministic u32 noise seed from a world seed and an offset.
/// Same (seed, offset) always gives the same result so terrain is reproducible.
#[inline]
fn deterministic_noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

/// Configuration for heightmap generation.
#[derive(Debug, Clone)]
pub struct HeightmapConfig {
    /// Size of terrain in world units (square, centred on the origin).
    pub size: f32,
    /// Number of vertices per side.
    pub resolution: u32,
    /// Maximum height of terrain.
    pub height_scale: f32,
    /// World height subtracted after scaling, so low ground can sit under water level.
    pub base_height: f32,
    /// Noise frequency (lower = smoother).
    pub frequency: f64,
    /// Number of octaves for fractal noise.
    pub octaves: u32,
    /// Lacunarity (frequency multiplier per octave).
    pub lacunarity: f64,
    /// Persistence (amplitude multiplier per octave).
    pub persistence: f64,
    /// Seed for random generation.
    pub seed: u64,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            size: 256.0,
            resolution: 129,
            height_scale: 20.0,
            base_height: 4.0,
            frequency: 0.015,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 0,
        }
    }
}

/// Generated height grid, row-major (index = z * resolution + x).
#[derive(Debug, Clone)]
pub struct Heightmap {
    pub heights: Vec<f32>,
    pub config: HeightmapConfig,
}

impl Heightmap {
    /// Generate a heightmap from configuration.
    pub fn generate(config: HeightmapConfig) -> Self {
        let perlin = Perlin::new(deterministic_noise_seed(config.seed, 0));
        let simplex = Simplex::new(deterministic_noise_seed(config.seed, 1));

        let res = config.resolution.max(2) as usize;
        let step = config.size / (res - 1) as f32;
        let half = config.size / 2.0;

        let mut heights = Vec::with_capacity(res * res);
        for z in 0..res {
            for x in 0..res {
                let world_x = x as f32 * step - half;
                let world_z = z as f32 * step - half;
                let n = Self::fractal_noise(&perlin, &simplex, world_x as f64, world_z as f64, &config);
                heights.push(n as f32 * config.height_scale - config.base_height);
            }
        }

        log::debug!(
            "generated {}x{} heightmap (seed {}, {:.1}..{:.1})",
            res,
            res,
            config.seed,
            heights.iter().copied().fold(f32::INFINITY, f32::min),
            heights.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        );

        Self { heights, config }
    }

    /// Vertices per side.
    pub fn resolution(&self) -> usize {
        self.config.resolution.max(2) as usize
    }

    /// Bilinear height at world (x, z); positions outside the map clamp to the edge.
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        let res = self.resolution();
        let half_size = self.config.size / 2.0;
        let step = self.config.size / (res - 1) as f32;

        let gx = ((x + half_size) / step).clamp(0.0, (res - 1) as f32);
        let gz = ((z + half_size) / step).clamp(0.0, (res - 1) as f32);

        let x0 = (gx.floor() as usize).min(res - 2);
        let z0 = (gz.floor() as usize).min(res - 2);
        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let h00 = self.heights[z0 * res + x0];
        let h10 = self.heights[z0 * res + x0 + 1];
        let h01 = self.heights[(z0 + 1) * res + x0];
        let h11 = self.heights[(z0 + 1) * res + x0 + 1];

        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fz
    }

    /// Surface point at world (x, z).
    pub fn surface_point(&self, x: f32, z: f32) -> Vec3 {
        Vec3::new(x, self.sample_height(x, z), z)
    }

    /// Check if a world position is within the map bounds.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let half = self.config.size / 2.0;
        x >= -half && x <= half && z >= -half && z <= half
    }

    fn fractal_noise(
        perlin: &Perlin,
        simplex: &Simplex,
        x: f64,
        z: f64,
        config: &HeightmapConfig,
    ) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = config.frequency;
        let mut max_value = 0.0;

        for _ in 0..config.octaves.max(1) {
            // Mix Perlin and Simplex for variety
            let perlin_sample = perlin.get([x * frequency, z * frequency]);
            let simplex_sample = simplex.get([x * frequency + 1000.0, z * frequency + 1000.0]);

            value += (perlin_sample * 0.7 + simplex_sample * 0.3) * amplitude;
            max_value += amplitude;

            amplitude *= config.persistence;
            frequency *= config.lacunarity;
        }

        // Normalize to 0-1 range
        (value / max_value + 1.0) * 0.5
    }
}
