//! Static collision world for terrain probing with Rapier3D.

use crate::collision::CollisionGroup;
use engine_core::Vec3;
use rapier3d::na::{Isometry3, Vector3};
use rapier3d::prelude::*;

/// Collision world holding the ground surface and cover obstacles.
///
/// The tactical layer never steps a simulation; it only queries. Call
/// [`PhysicsWorld::update_query_pipeline`] after adding colliders.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Update query pipeline for raycasting.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a ground plane collider (flat Y=0 half-space).
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .collision_groups(CollisionGroup::terrain())
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a static cover obstacle (rock, wall, wreck). No parent body; fixed in world.
    /// `translation`: world position of center. `rotation_y_rad`: rotation around Y axis in radians.
    /// `half_extents`: half sizes in local X, Y, Z (after rotation).
    pub fn add_cover_block(
        &mut self,
        translation: Vec3,
        rotation_y_rad: f32,
        half_extents: Vec3,
    ) -> ColliderHandle {
        let tra = vector![translation.x, translation.y, translation.z];
        let axisangle = Vector3::y_axis().into_inner() * (rotation_y_rad as Real);
        let position = Isometry3::new(tra, axisangle);
        let collider = ColliderBuilder::cuboid(
            half_extents.x as Real,
            half_extents.y as Real,
            half_extents.z as Real,
        )
        .position(position)
        .collision_groups(CollisionGroup::cover())
        .build();
        self.collider_set.insert(collider)
    }

    /// Add a heightfield collider for a square terrain patch centred on the origin.
    /// - `heights`: flat slice of height values in world Y, row-major order (index = z * ncols + x).
    /// - `nrows`, `ncols`: grid dimensions.
    /// - `size_x`, `size_z`: total extent in world units (terrain spans -size/2 to +size/2 in X and Z).
    /// Heights are used as-is (scale_y = 1), so they must already be in world space.
    pub fn add_terrain_heightfield(
        &mut self,
        heights: &[f32],
        nrows: usize,
        ncols: usize,
        size_x: f32,
        size_z: f32,
    ) -> ColliderHandle {
        assert!(
            nrows >= 2 && ncols >= 2,
            "Terrain heightfield must have at least 2 rows and columns"
        );
        assert!(
            heights.len() >= nrows * ncols,
            "Heights slice too small for {}x{} grid",
            nrows,
            ncols
        );

        let heights_matrix = DMatrix::from_fn(nrows, ncols, |i, j| heights[i * ncols + j] as Real);
        let scale = vector![size_x, 1.0, size_z];

        let collider = ColliderBuilder::heightfield(heights_matrix, scale)
            .collision_groups(CollisionGroup::terrain())
            .build();
        log::debug!(
            "terrain heightfield {}x{} spanning {}x{}",
            nrows,
            ncols,
            size_x,
            size_z
        );
        self.collider_set.insert(collider)
    }

    /// Number of colliders in the world.
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }
}
