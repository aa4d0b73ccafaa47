//! Tactical metadata for one square cell of terrain.

use glam::{IVec2, Vec2, Vec3};

/// Dominant terrain classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TerrainType {
    #[default]
    Normal,
    HighGround,
    Cover,
    Water,
    Mud,
    Impassable,
}

/// Derived, discardable summary of a cell. Rebuilt whenever it goes stale.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainCell {
    /// Mean sampled surface height.
    pub height: f32,
    /// Mean surface slope in degrees.
    pub average_slope: f32,
    pub is_high_ground: bool,
    pub provides_cover: bool,
    pub is_impassable: bool,
    /// Speed multiplier; 1.0 is unhindered. Meaningless when impassable.
    pub movement_modifier: f32,
    /// Points on nearby occluders a unit can hide behind.
    pub cover_points: Vec<Vec3>,
    pub terrain_type: TerrainType,
    /// Game time the cell was sampled.
    pub last_update_time: f32,
}

impl TerrainCell {
    /// Unremarkable open ground at `position`: flat, passable, no cover.
    /// Stands in for cells the world has no data for.
    pub fn assumed_average(position: Vec3, now: f32) -> Self {
        Self {
            height: position.y,
            average_slope: 0.0,
            is_high_ground: false,
            provides_cover: false,
            is_impassable: false,
            movement_modifier: 1.0,
            cover_points: Vec::new(),
            terrain_type: TerrainType::Normal,
            last_update_time: now,
        }
    }

    /// Movement modifier to use for decisions. Impassable cells never move.
    pub fn effective_mobility(&self) -> f32 {
        if self.is_impassable {
            0.0
        } else {
            self.movement_modifier
        }
    }

    pub fn age(&self, now: f32) -> f32 {
        now - self.last_update_time
    }

    /// Cover point closest to `position`.
    pub fn nearest_cover_point(&self, position: Vec3) -> Option<Vec3> {
        self.cover_points
            .iter()
            .copied()
            .min_by(|a, b| {
                a.distance_squared(position)
                    .total_cmp(&b.distance_squared(position))
            })
    }
}

/// Grid coordinate of the cell containing `position` (XZ plane).
pub fn world_to_grid(position: Vec3, cell_size: f32) -> IVec2 {
    IVec2::new(
        (position.x / cell_size).floor() as i32,
        (position.z / cell_size).floor() as i32,
    )
}

/// XZ centre of a grid cell.
pub fn grid_to_world(coord: IVec2, cell_size: f32) -> Vec2 {
    Vec2::new(
        (coord.x as f32 + 0.5) * cell_size,
        (coord.y as f32 + 0.5) * cell_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> TerrainCell {
        TerrainCell {
            height: 2.0,
            average_slope: 10.0,
            is_high_ground: false,
            provides_cover: true,
            is_impassable: false,
            movement_modifier: 0.8,
            cover_points: vec![Vec3::new(4.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0)],
            terrain_type: TerrainType::Cover,
            last_update_time: 3.0,
        }
    }

    #[test]
    fn impassable_cell_has_zero_mobility() {
        let mut c = cell();
        assert_eq!(c.effective_mobility(), 0.8);
        c.is_impassable = true;
        assert_eq!(c.effective_mobility(), 0.0);
    }

    #[test]
    fn nearest_cover_point_picks_closest() {
        assert_eq!(
            cell().nearest_cover_point(Vec3::ZERO),
            Some(Vec3::new(1.0, 0.0, 1.0))
        );
    }

    #[test]
    fn assumed_average_is_open_passable_ground() {
        let c = TerrainCell::assumed_average(Vec3::new(3.0, 7.0, 1.0), 2.0);
        assert_eq!(c.height, 7.0);
        assert_eq!(c.effective_mobility(), 1.0);
        assert!(!c.provides_cover && !c.is_high_ground);
        assert_eq!(c.terrain_type, TerrainType::Normal);
        assert_eq!(c.age(2.5), 0.5);
    }

    #[test]
    fn grid_floors_negative_coordinates() {
        assert_eq!(world_to_grid(Vec3::new(-0.1, 0.0, 4.9), 5.0), IVec2::new(-1, 0));
        assert_eq!(grid_to_world(IVec2::new(-1, 0), 5.0), Vec2::new(-2.5, 2.5));
    }
}
