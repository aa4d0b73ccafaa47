//! Spatial queries the tactical layer issues against the world.
//!
//! The physics crate implements [`WorldQuery`] over its collision world; tests use small
//! analytic worlds instead.

use glam::Vec3;

/// Collision layers a query may select. Bit values match the physics collision groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryMask(pub u32);

impl QueryMask {
    /// Ground surface (heightfields, ground planes).
    pub const TERRAIN: QueryMask = QueryMask(1 << 0);
    /// Obstacles tall enough to hide behind (rocks, walls, wrecks).
    pub const COVER: QueryMask = QueryMask(1 << 1);

    pub fn contains(self, other: QueryMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for QueryMask {
    type Output = QueryMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        QueryMask(self.0 | rhs.0)
    }
}

/// Result of a downward probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// World position of the hit.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

impl ProbeHit {
    /// Angle between the surface normal and straight up, in degrees.
    pub fn slope_degrees(&self) -> f32 {
        let normal = self.normal.normalize_or_zero();
        if normal == Vec3::ZERO {
            return 0.0;
        }
        normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// A collider found by an overlap query, reduced to what cover analysis needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occluder {
    /// Point on the collider closest to the query centre.
    pub closest_point: Vec3,
    /// Vertical extent of the collider's bounds.
    pub height: f32,
}

/// Spatial query primitives provided by the world/physics collaborator.
pub trait WorldQuery {
    /// Cast straight down from `origin` up to `max_distance`.
    fn probe_downward(&self, origin: Vec3, max_distance: f32) -> Option<ProbeHit>;

    /// All colliders on the `mask` layers intersecting the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: QueryMask) -> Vec<Occluder>;
}
