//! Ray and overlap queries used for terrain probing and cover detection.

use crate::collision::mask_filter;
use crate::PhysicsWorld;
use engine_core::{Occluder, ProbeHit, QueryMask, Vec3, WorldQuery};
use rapier3d::parry::query::PointQuery;
use rapier3d::prelude::*;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The collider that was hit.
    pub collider: ColliderHandle,
    /// Distance along the ray to the hit point.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

impl PhysicsWorld {
    /// Cast a ray against the `mask` layers and return the first hit.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: QueryMask,
    ) -> Option<RaycastHit> {
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                mask_filter(mask),
            )
            .map(|(collider, intersection)| {
                let point = ray.point_at(intersection.time_of_impact);
                RaycastHit {
                    collider,
                    distance: intersection.time_of_impact,
                    point: Vec3::new(point.x, point.y, point.z),
                    normal: Vec3::new(
                        intersection.normal.x,
                        intersection.normal.y,
                        intersection.normal.z,
                    ),
                }
            })
    }

    /// Find all colliders on the `mask` layers within a sphere.
    pub fn overlap_sphere_handles(
        &self,
        center: Vec3,
        radius: f32,
        mask: QueryMask,
    ) -> Vec<ColliderHandle> {
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(center.x, center.y, center.z);

        let mut results = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &shape,
            mask_filter(mask),
            |collider| {
                results.push(collider);
                true // Continue searching
            },
        );

        results
    }
}

impl WorldQuery for PhysicsWorld {
    fn probe_downward(&self, origin: Vec3, max_distance: f32) -> Option<ProbeHit> {
        self.raycast(
            origin,
            -Vec3::Y,
            max_distance,
            QueryMask::TERRAIN | QueryMask::COVER,
        )
        .map(|hit| ProbeHit {
            point: hit.point,
            normal: hit.normal,
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: QueryMask) -> Vec<Occluder> {
        let query_point = point![center.x, center.y, center.z];
        self.overlap_sphere_handles(center, radius, mask)
            .into_iter()
            .filter_map(|handle| self.collider_set.get(handle))
            .map(|collider| {
                let aabb = collider.compute_aabb();
                let projection =
                    collider
                        .shape()
                        .project_point(collider.position(), &query_point, true);
                Occluder {
                    closest_point: Vec3::new(
                        projection.point.x,
                        projection.point.y,
                        projection.point.z,
                    ),
                    height: aabb.maxs.y - aabb.mins.y,
                }
            })
            .collect()
    }
}
