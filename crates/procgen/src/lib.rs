//! Procedural generation of skirmish battlefields: heightmaps and cover obstacles.

pub mod cover;
pub mod terrain;

pub use cover::*;
pub use terrain::*;
