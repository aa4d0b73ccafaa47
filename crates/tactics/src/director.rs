//! Owns every piece of tactical state and runs the tick.
//!
//! The host feeds game time through [`TacticalDirector::advance`] together with the unit
//! world and a [`WorldQuery`]. When a tick is due the director snapshots the units, pumps
//! terrain probes, analyses units, steps the squad machines, coordinates squads, and hands
//! back every order produced as a [`TickReport`].

use std::collections::BTreeSet;

use engine_core::{Entity, Faction, TickClock, Vec3, World, WorldQuery};

use crate::analyzer::{AnalysisContext, UnitAnalyzer, UnitTacticalState};
use crate::config::TacticsConfig;
use crate::coordination::{AmbushCoordination, AmbushId, CoordinationContext, InterSquadCoordinator};
use crate::error::TacticsError;
use crate::intent::{IntentBuffer, UnitController, UnitOrder};
use crate::registry::UnitRegistry;
use crate::scoring::PositionScorer;
use crate::squad::{
    ContactBoard, Squad, SquadCoordinator, SquadId, SquadPhase, SquadRole, SquadRoster,
    SquadTickContext,
};
use crate::terrain::TerrainCache;
use crate::threat::ThreatAssessor;

/// Notable transitions observed during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TacticalEvent {
    PhaseChanged {
        squad: SquadId,
        from: SquadPhase,
        to: SquadPhase,
    },
    TargetAcquired {
        squad: SquadId,
        target: Entity,
    },
    SupportAssigned {
        support: SquadId,
        assault: SquadId,
    },
    AmbushTriggered {
        ambush: AmbushId,
        intruder: Vec3,
    },
    ContactReported {
        squad: SquadId,
        target: Entity,
        position: Vec3,
    },
    BunkerFortified {
        bunker: Entity,
    },
}

/// Everything one tick produced, in emission order.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    /// Game time of the tick in seconds.
    pub time: f32,
    pub orders: Vec<UnitOrder>,
    pub events: Vec<TacticalEvent>,
}

impl TickReport {
    /// Replay the orders onto the unit collaborator.
    pub fn dispatch(&self, controller: &mut impl UnitController) {
        for order in &self.orders {
            order.dispatch(controller);
        }
    }
}

pub struct TacticalDirector {
    config: TacticsConfig,
    clock: TickClock,
    last_tick_time: Option<f32>,
    home_faction: Faction,
    terrain: TerrainCache,
    scorer: PositionScorer,
    threat: ThreatAssessor,
    analyzer: UnitAnalyzer,
    roster: SquadRoster,
    squads: SquadCoordinator,
    coordinator: InterSquadCoordinator,
    contacts: ContactBoard,
    intents: IntentBuffer,
}

impl TacticalDirector {
    pub fn new(config: TacticsConfig, home_faction: Faction) -> Self {
        Self {
            clock: TickClock::new(config.tick_interval),
            last_tick_time: None,
            home_faction,
            terrain: TerrainCache::new(config.terrain.clone()),
            scorer: PositionScorer::new(config.scoring.clone()),
            threat: ThreatAssessor::new(config.threat.clone()),
            analyzer: UnitAnalyzer::new(config.analyzer.clone()),
            roster: SquadRoster::new(config.squads.max_squad_size),
            squads: SquadCoordinator::new(config.squads.clone()),
            coordinator: InterSquadCoordinator::new(config.coordination.clone()),
            contacts: ContactBoard::new(config.squads.contact_ttl),
            intents: IntentBuffer::new(),
            config,
        }
    }

    /// Replace the scout patrol pattern.
    pub fn with_squad_coordinator(mut self, squads: SquadCoordinator) -> Self {
        self.squads = squads;
        self
    }

    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    pub fn home_faction(&self) -> Faction {
        self.home_faction
    }

    pub fn create_squad(&mut self, role: SquadRole) -> SquadId {
        self.create_squad_for(self.home_faction, role)
    }

    pub fn create_squad_for(&mut self, faction: Faction, role: SquadRole) -> SquadId {
        let id = self.roster.create(role, faction);
        log::info!("created {:?} squad {} for faction {}", role, id, faction.0);
        id
    }

    pub fn remove_squad(&mut self, id: SquadId) -> Option<Squad> {
        self.roster.remove(id)
    }

    /// Move `unit` into `squad`, leaving any squad it belonged to. Role orders are queued
    /// for the next report.
    pub fn assign_unit_to_squad(&mut self, unit: Entity, squad: SquadId) -> Result<(), TacticsError> {
        self.roster.assign(unit, squad, &mut self.intents)
    }

    pub fn remove_unit_from_squad(&mut self, unit: Entity) -> Option<SquadId> {
        self.roster.unassign(unit)
    }

    /// Override or clear a squad's target. The squad searches for a new one when cleared.
    pub fn set_primary_target(
        &mut self,
        squad: SquadId,
        target: Option<Entity>,
    ) -> Result<(), TacticsError> {
        let squad = self
            .roster
            .get_mut(squad)
            .ok_or(TacticsError::UnknownSquad(squad))?;
        squad.primary_target = target;
        Ok(())
    }

    /// Centre of a scout squad's patrol.
    pub fn set_rally_point(&mut self, squad: SquadId, point: Vec3) -> Result<(), TacticsError> {
        let squad = self
            .roster
            .get_mut(squad)
            .ok_or(TacticsError::UnknownSquad(squad))?;
        squad.rally_point = Some(point);
        squad.patrol_index = 0;
        Ok(())
    }

    pub fn initiate_ambush(&mut self, squad: SquadId, center: Vec3) -> Result<AmbushId, TacticsError> {
        self.coordinator.initiate_ambush(&mut self.roster, squad, center)
    }

    pub fn cancel_ambush(&mut self, id: AmbushId) -> Result<(), TacticsError> {
        self.coordinator
            .cancel_ambush(&mut self.roster, id, &mut self.intents)
    }

    pub fn report_ammo_spent(&mut self, artillery: Entity, amount: f32) {
        self.coordinator.report_ammo_spent(artillery, amount);
    }

    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.roster.get(id)
    }

    pub fn squads(&self) -> impl Iterator<Item = &Squad> + '_ {
        self.roster.iter()
    }

    /// Hostile pressure on a squad as the world stands now, discounted by known cover.
    pub fn squad_threat(&self, id: SquadId, units: &World) -> Option<f32> {
        let squad = self.roster.get(id)?;
        let registry = UnitRegistry::snapshot(units);
        Some(self.threat.squad_threat(&registry, &self.terrain, squad))
    }

    pub fn squad_of(&self, unit: Entity) -> Option<SquadId> {
        self.roster.squad_of(unit)
    }

    pub fn unit_state(&self, unit: Entity) -> Option<&UnitTacticalState> {
        self.analyzer.state(unit)
    }

    pub fn unit_states(&self) -> impl Iterator<Item = (Entity, &UnitTacticalState)> + '_ {
        self.analyzer.states()
    }

    pub fn terrain(&self) -> &TerrainCache {
        &self.terrain
    }

    pub fn ambushes(&self) -> impl Iterator<Item = &AmbushCoordination> + '_ {
        self.coordinator.ambushes()
    }

    pub fn contacts(&self) -> &ContactBoard {
        &self.contacts
    }

    /// Game time seen so far.
    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed_seconds()
    }

    /// Feed `dt` seconds of game time; runs a tick when one is due.
    pub fn advance(&mut self, dt: f32, units: &World, world: &dyn WorldQuery) -> Option<TickReport> {
        if self.clock.advance(dt) {
            Some(self.tick(units, world))
        } else {
            None
        }
    }

    /// Run a tick now, regardless of the cadence.
    pub fn run_tick(&mut self, units: &World, world: &dyn WorldQuery) -> TickReport {
        self.clock.force_tick();
        self.tick(units, world)
    }

    /// The home faction plus every faction that owns a squad.
    fn managed_factions(&self) -> Vec<Faction> {
        let mut factions: BTreeSet<u8> = self.roster.iter().map(|s| s.faction.0).collect();
        factions.insert(self.home_faction.0);
        factions.into_iter().map(Faction).collect()
    }

    fn tick(&mut self, units: &World, world: &dyn WorldQuery) -> TickReport {
        let now = self.clock.elapsed_seconds();
        let dt = self.last_tick_time.map_or(self.clock.interval(), |last| now - last);
        self.last_tick_time = Some(now);

        let registry = UnitRegistry::snapshot(units);
        self.terrain.pump(world, now);
        let managed = self.managed_factions();
        let mut events = Vec::new();

        let analysed = self.analyzer.update(&mut AnalysisContext {
            units: &registry,
            terrain: &mut self.terrain,
            scorer: &self.scorer,
            threat: &self.threat,
            roster: &self.roster,
            intents: &mut self.intents,
            managed: &managed,
            now,
        });

        self.squads.update(
            &mut self.roster,
            &mut SquadTickContext {
                units: &registry,
                terrain: &mut self.terrain,
                scorer: &self.scorer,
                threat: &self.threat,
                contacts: &mut self.contacts,
                intents: &mut self.intents,
                events: &mut events,
                now,
            },
        );

        self.coordinator.update(
            &mut self.roster,
            &mut CoordinationContext {
                units: &registry,
                threat: &self.threat,
                intents: &mut self.intents,
                events: &mut events,
                managed: &managed,
                dt,
            },
        );

        let orders = self.intents.drain();
        let tick = self.clock.tick_count();
        log::debug!(
            "tick {} at {:.2}s: {} units, {} analysed, {} orders, {} events",
            tick,
            now,
            registry.len(),
            analysed,
            orders.len(),
            events.len()
        );

        TickReport {
            tick,
            time: now,
            orders,
            events,
        }
    }
}
