//! Terrain sampling and the tactical terrain cache.

mod cache;
mod cell;
mod probe;

pub use cache::{CellLookup, PumpStats, TerrainCache};
pub use cell::{grid_to_world, world_to_grid, TerrainCell, TerrainType};
pub use probe::ProbeJob;
