//! Squad-level geometry: flank anchors and lines, support standoff, rings, cohesion.

use std::f32::consts::TAU;

use engine_core::{flatten, Vec3};

/// The two flank anchors beside `target`, `[+p, -p]`, where `p` is the XZ perpendicular of
/// the centroid → target axis.
pub fn flank_anchors(centroid: Vec3, target: Vec3, spread: f32) -> [Vec3; 2] {
    let axis = flatten(target - centroid).try_normalize().unwrap_or(Vec3::X);
    let perpendicular = Vec3::new(-axis.z, 0.0, axis.x);
    [target + perpendicular * spread, target - perpendicular * spread]
}

/// `count` slots centred on `anchor`, spaced along the line perpendicular to anchor → target.
pub fn flank_line(anchor: Vec3, target: Vec3, count: usize, spacing: f32) -> Vec<Vec3> {
    let lateral = flatten(target - anchor)
        .try_normalize()
        .map(|dir| dir.cross(Vec3::Y))
        .unwrap_or(Vec3::X);
    let middle = (count as f32 - 1.0) * 0.5;
    (0..count)
        .map(|i| anchor + lateral * ((i as f32 - middle) * spacing))
        .collect()
}

/// Where a support squad stands relative to the squad it supports: behind it along its
/// heading, or on the near side when it has no heading.
pub fn support_position(
    supported_centroid: Vec3,
    supported_heading: Vec3,
    own_centroid: Vec3,
    standoff: f32,
) -> Vec3 {
    let back = if supported_heading != Vec3::ZERO {
        supported_heading
    } else {
        match flatten(supported_centroid - own_centroid).try_normalize() {
            Some(dir) => dir,
            None => return supported_centroid,
        }
    };
    supported_centroid - back * standoff
}

/// `count` evenly spaced points on a circle; slot `k` at angle `k * 2π / count`.
pub fn ring_slots(center: Vec3, radius: f32, count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|k| {
            let angle = k as f32 * TAU / count as f32;
            center + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius
        })
        .collect()
}

/// Destination pulling a straggler back toward the centroid, or `None` if it is close enough.
pub fn cohesion_pull(position: Vec3, centroid: Vec3, radius: f32, strength: f32) -> Option<Vec3> {
    let offset = flatten(centroid - position);
    if offset.length() <= radius * strength {
        return None;
    }
    offset.try_normalize().map(|dir| position + dir * radius)
}
