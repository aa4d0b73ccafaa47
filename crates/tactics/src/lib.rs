//! Tactical decision core for RTS squads.
//!
//! The [`TacticalDirector`] owns every piece of tactical state and runs a fixed-cadence
//! tick: snapshot live units, sample terrain under a probe budget, score positions for
//! individual units, step squad state machines, coordinate squads, then hand back the
//! resulting [`UnitOrder`]s. Nothing here moves units; the caller executes the orders.

pub mod analyzer;
pub mod config;
pub mod coordination;
pub mod director;
pub mod error;
pub mod intent;
pub mod registry;
pub mod scoring;
pub mod squad;
pub mod terrain;
pub mod threat;

pub use analyzer::{AnalysisContext, UnitAnalyzer, UnitTacticalState};
pub use config::*;
pub use coordination::{AmbushCoordination, AmbushId, InterSquadCoordinator, ShieldNetwork};
pub use director::{TacticalDirector, TacticalEvent, TickReport};
pub use error::{ConfigError, TacticsError};
pub use intent::{IntentBuffer, UnitController, UnitIntent, UnitOrder};
pub use registry::{UnitRegistry, UnitView};
pub use scoring::{PositionScorer, ScoredPosition, ScoringContext, TacticalBehavior};
pub use squad::{
    ContactBoard, PatrolRing, ReconRoute, Squad, SquadCoordinator, SquadId, SquadPhase,
    SquadRole, SquadRoster,
};
pub use terrain::{CellLookup, TerrainCache, TerrainCell, TerrainType};
pub use threat::ThreatAssessor;
