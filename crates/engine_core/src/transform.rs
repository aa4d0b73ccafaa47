//! Transform component and planar helpers for ground units.

use glam::{Quat, Vec3};

/// Position and orientation of a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Turn to face along `direction` in the XZ plane. Zero directions are ignored.
    pub fn face_planar(&mut self, direction: Vec3) {
        let flat = flatten(direction).normalize_or_zero();
        if flat.length_squared() > 0.0001 {
            self.rotation = Quat::from_rotation_arc(-Vec3::Z, flat);
        }
    }
}

/// Drop the vertical component of a vector.
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Distance between two points measured in the XZ plane.
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(a - b).length()
}
