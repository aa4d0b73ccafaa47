//! Core engine types shared by the tactical layer and its collaborators.
//!
//! This crate provides the foundational types used across all crates:
//! - Transform and unit components stored in the `hecs` unit registry
//! - The fixed-cadence tactical clock
//! - The world query interface implemented by the physics layer

pub mod components;
pub mod time;
pub mod transform;
pub mod world_query;

pub use components::*;
pub use time::*;
pub use transform::*;
pub use world_query::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
