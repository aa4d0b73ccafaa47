//! Resumable terrain sampling.
//!
//! A [`ProbeJob`] owns the sample layout of one cell and is advanced a bounded batch of
//! downward probes at a time. Once every sample has been issued it can be folded into a
//! [`TerrainCell`].

use engine_core::{ProbeHit, QueryMask, WorldQuery};
use glam::{IVec2, Vec2, Vec3};

use crate::config::TerrainAnalysisConfig;
use crate::terrain::cell::{grid_to_world, TerrainCell, TerrainType};

/// Movement modifier of water cells.
const WATER_MOBILITY: f32 = 0.3;
/// Height band above the water level that counts as mud.
const MUD_BAND: f32 = 0.5;
/// High ground slows movement a little.
const HIGH_GROUND_MOBILITY: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct ProbeJob {
    coord: IVec2,
    center: Vec2,
    samples: Vec<Vec2>,
    next: usize,
    hits: Vec<ProbeHit>,
}

impl ProbeJob {
    pub fn new(coord: IVec2, config: &TerrainAnalysisConfig) -> Self {
        let center = grid_to_world(coord, config.analysis_grid_size);
        Self {
            coord,
            center,
            samples: sample_offsets(config)
                .into_iter()
                .map(|offset| center + offset)
                .collect(),
            next: 0,
            hits: Vec::new(),
        }
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.samples.len()
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.next
    }

    /// Issue up to `budget` probes. Returns how many were issued.
    pub fn step(
        &mut self,
        world: &dyn WorldQuery,
        config: &TerrainAnalysisConfig,
        budget: usize,
    ) -> usize {
        let end = (self.next + budget).min(self.samples.len());
        for sample in &self.samples[self.next..end] {
            let origin = Vec3::new(sample.x, config.max_analysis_height, sample.y);
            if let Some(hit) = world.probe_downward(origin, config.max_analysis_height * 2.0) {
                self.hits.push(hit);
            }
        }
        let issued = end - self.next;
        self.next = end;
        issued
    }

    /// Fold the collected samples into a cell. `None` when no probe hit anything.
    pub fn finish(
        self,
        world: &dyn WorldQuery,
        config: &TerrainAnalysisConfig,
        now: f32,
    ) -> Option<TerrainCell> {
        if self.hits.is_empty() {
            return None;
        }

        let count = self.hits.len() as f32;
        let mut sum_height = 0.0;
        let mut sum_slope = 0.0;
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;
        for hit in &self.hits {
            let h = hit.point.y;
            sum_height += h;
            sum_slope += hit.slope_degrees();
            min_height = min_height.min(h);
            max_height = max_height.max(h);
        }
        let height = sum_height / count;
        let average_slope = sum_slope / count;

        let (mut terrain_type, mut movement_modifier) = if height <= config.water_level {
            (TerrainType::Water, WATER_MOBILITY)
        } else if height <= config.water_level + MUD_BAND {
            (TerrainType::Mud, config.mud_slowdown_factor)
        } else {
            let steepness = average_slope / config.max_traversable_slope;
            (TerrainType::Normal, (1.0 - steepness * 0.5).max(0.0))
        };

        let is_high_ground = max_height - min_height >= config.high_ground_threshold;
        if is_high_ground {
            terrain_type = TerrainType::HighGround;
            movement_modifier *= HIGH_GROUND_MOBILITY;
        }

        let center = Vec3::new(self.center.x, height, self.center.y);
        let radius = config.analysis_grid_size * 0.5;
        let cover_points: Vec<Vec3> = world
            .overlap_sphere(center, radius, QueryMask::COVER)
            .into_iter()
            .filter(|o| o.height > config.cover_height)
            .filter(|o| o.closest_point.distance(center) <= radius)
            .map(|o| o.closest_point)
            .collect();
        let provides_cover = !cover_points.is_empty();
        if provides_cover {
            terrain_type = TerrainType::Cover;
        }

        let is_impassable = average_slope > config.max_traversable_slope;
        if is_impassable {
            terrain_type = TerrainType::Impassable;
        }

        Some(TerrainCell {
            height,
            average_slope,
            is_high_ground,
            provides_cover,
            is_impassable,
            movement_modifier,
            cover_points,
            terrain_type,
            last_update_time: now,
        })
    }
}

/// Square sample layout from `-size/2` to `+size/2` inclusive on both axes.
fn sample_offsets(config: &TerrainAnalysisConfig) -> Vec<Vec2> {
    let size = config.analysis_grid_size;
    let spacing = config.height_sample_spacing;
    if spacing <= 0.0 || size <= 0.0 {
        return vec![Vec2::ZERO];
    }
    let per_axis = (size / spacing + 1e-4).floor() as usize + 1;
    let half = size * 0.5;
    let mut offsets = Vec::with_capacity(per_axis * per_axis);
    for iz in 0..per_axis {
        for ix in 0..per_axis {
            offsets.push(Vec2::new(
                -half + ix as f32 * spacing,
                -half + iz as f32 * spacing,
            ));
        }
    }
    offsets
}
