//! Collision groups and filtering.

use engine_core::QueryMask;
use rapier3d::prelude::*;

/// Collision groups for the static tactical world. Bits match [`QueryMask`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Ground surface (heightfields, ground planes)
    Terrain = 1 << 0,
    /// Obstacles that block line of fire
    Cover = 1 << 1,
}

impl CollisionGroup {
    /// Membership/filter pair for ground colliders.
    pub fn terrain() -> InteractionGroups {
        InteractionGroups::new(Group::from_bits_retain(Self::Terrain as u32), Group::ALL)
    }

    /// Membership/filter pair for cover obstacles.
    pub fn cover() -> InteractionGroups {
        InteractionGroups::new(Group::from_bits_retain(Self::Cover as u32), Group::ALL)
    }
}

/// Query filter that only reports colliders on the layers selected by `mask`.
pub fn mask_filter(mask: QueryMask) -> QueryFilter<'static> {
    QueryFilter::default().groups(InteractionGroups::new(
        Group::ALL,
        Group::from_bits_retain(mask.0),
    ))
}
