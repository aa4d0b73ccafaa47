//! Per-unit tactical analysis for units of managed factions.
//!
//! A bounded number of units is analysed per tick, round-robin by entity id. Analysis
//! picks a posture from unit kind, health, pressure and the terrain underfoot, then looks
//! for a better position under that posture. Units that belong to a squad keep their
//! state up to date but take orders from their squad instead.

use std::collections::HashMap;

use engine_core::{planar_distance, Entity, Faction, UnitKind, Vec3};

use crate::config::AnalyzerConfig;
use crate::intent::{IntentBuffer, UnitIntent};
use crate::registry::{UnitRegistry, UnitView};
use crate::scoring::{PositionScorer, ScoringContext, TacticalBehavior};
use crate::squad::SquadRoster;
use crate::terrain::{CellLookup, TerrainCache, TerrainCell};
use crate::threat::ThreatAssessor;

#[derive(Debug, Clone, PartialEq)]
pub struct UnitTacticalState {
    pub optimal_position: Vec3,
    pub tactical_score: f32,
    pub needs_repositioning: bool,
    pub current_behavior: TacticalBehavior,
    /// Nearest first.
    pub cover_candidates: Vec<Vec3>,
    pub last_update_time: f32,
}

impl Default for UnitTacticalState {
    fn default() -> Self {
        Self {
            optimal_position: Vec3::ZERO,
            tactical_score: f32::MIN,
            needs_repositioning: false,
            current_behavior: TacticalBehavior::default(),
            cover_candidates: Vec::new(),
            last_update_time: f32::NEG_INFINITY,
        }
    }
}

pub struct AnalysisContext<'a> {
    pub units: &'a UnitRegistry,
    pub terrain: &'a mut TerrainCache,
    pub scorer: &'a PositionScorer,
    pub threat: &'a ThreatAssessor,
    pub roster: &'a SquadRoster,
    pub intents: &'a mut IntentBuffer,
    /// Factions whose units are analysed.
    pub managed: &'a [Faction],
    pub now: f32,
}

#[derive(Debug, Clone)]
pub struct UnitAnalyzer {
    config: AnalyzerConfig,
    states: HashMap<Entity, UnitTacticalState>,
    /// Entity bits of the last unit analysed; the next pass starts after it.
    cursor: u64,
}

impl UnitAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
            cursor: 0,
        }
    }

    pub fn state(&self, unit: Entity) -> Option<&UnitTacticalState> {
        self.states.get(&unit)
    }

    pub fn states(&self) -> impl Iterator<Item = (Entity, &UnitTacticalState)> + '_ {
        self.states.iter().map(|(e, s)| (*e, s))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Analyse up to `max_unit_analyses_per_tick` due units. Returns how many were attempted.
    pub fn update(&mut self, ctx: &mut AnalysisContext<'_>) -> usize {
        let units = ctx.units;
        self.states.retain(|unit, _| units.is_alive(*unit));

        let managed: Vec<&UnitView> = units
            .iter()
            .filter(|u| ctx.managed.contains(&u.faction))
            .collect();
        let split = managed
            .iter()
            .position(|u| u.entity.to_bits().get() > self.cursor)
            .unwrap_or(managed.len());
        let (before, after) = managed.split_at(split);

        let mut attempted = 0;
        for &view in after.iter().chain(before) {
            if attempted >= self.config.max_unit_analyses_per_tick {
                break;
            }
            let due = self
                .states
                .get(&view.entity)
                .map_or(true, |s| ctx.now - s.last_update_time >= self.config.unit_update_interval);
            if !due {
                continue;
            }
            attempted += 1;
            self.cursor = view.entity.to_bits().get();
            self.analyze_unit(view, ctx);
        }
        attempted
    }

    fn analyze_unit(&mut self, view: &UnitView, ctx: &mut AnalysisContext<'_>) {
        let cell = match ctx.terrain.analyze(view.position, ctx.now) {
            CellLookup::Fresh(cell) | CellLookup::Stale(cell) => cell.clone(),
            CellLookup::Unknown => TerrainCell::assumed_average(view.position, ctx.now),
            CellLookup::Pending => return,
        };
        let behavior = self.determine_behavior(view, &cell, ctx);

        let mut scoring = ScoringContext {
            terrain: &mut *ctx.terrain,
            units: ctx.units,
            threat: ctx.threat,
            faction: view.faction,
            subject: Some(view.entity),
            now: ctx.now,
        };
        let best = ctx
            .scorer
            .find_optimal_position(&mut scoring, view.position, behavior);

        let state = self.states.entry(view.entity).or_default();
        if state.current_behavior != behavior {
            state.current_behavior = behavior;
            state.tactical_score = f32::MIN;
        }
        if best.score > state.tactical_score {
            state.optimal_position = best.position;
            state.tactical_score = best.score;
            state.needs_repositioning = true;
        }

        let mut cover = cell.cover_points;
        cover.sort_by(|a, b| {
            planar_distance(*a, view.position).total_cmp(&planar_distance(*b, view.position))
        });
        cover.truncate(self.config.max_cover_candidates);
        state.cover_candidates = cover;
        state.last_update_time = ctx.now;

        if ctx.roster.squad_of(view.entity).is_none() {
            apply_decisions(view, state, self.config.reposition_threshold, ctx.intents);
        }
    }

    fn determine_behavior(
        &self,
        view: &UnitView,
        cell: &TerrainCell,
        ctx: &AnalysisContext<'_>,
    ) -> TacticalBehavior {
        match view.profile.kind {
            UnitKind::Artillery if cell.is_high_ground => return TacticalBehavior::Aggressive,
            UnitKind::Artillery => return TacticalBehavior::Mobile,
            UnitKind::Bunker if cell.provides_cover => return TacticalBehavior::Defensive,
            UnitKind::Bunker => return TacticalBehavior::Mobile,
            _ => {}
        }
        if view.health_fraction < self.config.defensive_health {
            TacticalBehavior::Defensive
        } else if view.health_fraction < self.config.support_health {
            TacticalBehavior::Support
        } else if ctx.threat.is_under_heavy_attack(ctx.units, view) {
            TacticalBehavior::Defensive
        } else {
            TacticalBehavior::Aggressive
        }
    }
}

fn apply_decisions(
    view: &UnitView,
    state: &mut UnitTacticalState,
    threshold: f32,
    intents: &mut IntentBuffer,
) {
    if !state.needs_repositioning {
        return;
    }
    let unit = view.entity;
    if planar_distance(view.position, state.optimal_position) > threshold {
        intents.push(unit, UnitIntent::SetDestination(state.optimal_position));
    }
    match state.current_behavior {
        TacticalBehavior::Aggressive => intents.push(unit, UnitIntent::SetAggressive(true)),
        TacticalBehavior::Defensive => {
            intents.push(unit, UnitIntent::SetAggressive(false));
            if let Some(&cover) = state.cover_candidates.first() {
                intents.push(unit, UnitIntent::UseCover(cover));
            }
        }
        TacticalBehavior::Mobile => {
            intents.push(unit, UnitIntent::SetAggressive(false));
            intents.push(unit, UnitIntent::EnableFlanking(true));
        }
        TacticalBehavior::Support => {
            intents.push(unit, UnitIntent::SetAggressive(false));
            intents.push(unit, UnitIntent::ProvideSupportFire(true));
        }
    }
    state.needs_repositioning = false;
}
