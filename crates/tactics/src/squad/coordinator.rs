//! Per-role squad state machines.
//!
//! One [`SquadCoordinator::update`] call is the squad phase of a tactical tick:
//! refresh every squad, run the non-support roles in id order, then run support squads
//! against a snapshot taken after everyone else moved, and finally pull stragglers back
//! toward their squad.

use engine_core::{flatten, planar_distance, Faction, Vec3};

use crate::config::SquadConfig;
use crate::director::TacticalEvent;
use crate::intent::{IntentBuffer, UnitIntent};
use crate::registry::{UnitRegistry, UnitView};
use crate::scoring::{PositionScorer, ScoringContext, TacticalBehavior};
use crate::squad::formation::{cohesion_pull, flank_anchors, flank_line, support_position};
use crate::squad::scout::{ContactBoard, PatrolRing, ReconRoute};
use crate::squad::{Squad, SquadId, SquadPhase, SquadRole, SquadRoster};
use crate::terrain::TerrainCache;
use crate::threat::ThreatAssessor;

/// Shared state a squad tick reads and writes.
pub struct SquadTickContext<'a> {
    pub units: &'a UnitRegistry,
    pub terrain: &'a mut TerrainCache,
    pub scorer: &'a PositionScorer,
    pub threat: &'a ThreatAssessor,
    pub contacts: &'a mut ContactBoard,
    pub intents: &'a mut IntentBuffer,
    pub events: &'a mut Vec<TacticalEvent>,
    pub now: f32,
}

impl SquadTickContext<'_> {
    fn scoring(&mut self, faction: Faction) -> ScoringContext<'_> {
        ScoringContext {
            terrain: &mut *self.terrain,
            units: self.units,
            threat: self.threat,
            faction,
            subject: None,
            now: self.now,
        }
    }

    /// Best position around `center` for a squad of `faction`.
    fn optimal_position(&mut self, faction: Faction, center: Vec3, behavior: TacticalBehavior) -> Vec3 {
        let scorer = self.scorer;
        let mut scoring = self.scoring(faction);
        scorer.find_optimal_position(&mut scoring, center, behavior).position
    }
}

/// What a support squad needs to know about the others.
#[derive(Debug, Clone, Copy)]
struct SquadSummary {
    id: SquadId,
    role: SquadRole,
    faction: Faction,
    phase: SquadPhase,
    centroid: Vec3,
    heading: Vec3,
    average_health: f32,
    live: usize,
}

impl From<&Squad> for SquadSummary {
    fn from(squad: &Squad) -> Self {
        Self {
            id: squad.id,
            role: squad.role,
            faction: squad.faction,
            phase: squad.phase,
            centroid: squad.centroid,
            heading: squad.heading,
            average_health: squad.average_health,
            live: squad.members.len(),
        }
    }
}

pub struct SquadCoordinator {
    config: SquadConfig,
    route: Box<dyn ReconRoute>,
}

impl SquadCoordinator {
    pub fn new(config: SquadConfig) -> Self {
        let route = PatrolRing::new(config.scout_patrol_radius, config.scout_waypoints);
        Self {
            config,
            route: Box::new(route),
        }
    }

    /// Replace the scouts' patrol route.
    pub fn with_route(mut self, route: impl ReconRoute + 'static) -> Self {
        self.route = Box::new(route);
        self
    }

    pub fn config(&self) -> &SquadConfig {
        &self.config
    }

    pub fn update(&self, roster: &mut SquadRoster, ctx: &mut SquadTickContext<'_>) {
        roster.refresh(ctx.units);
        ctx.contacts.expire(ctx.now);
        let ids = roster.ids();

        for &id in &ids {
            let Some(squad) = roster.get_mut(id) else {
                continue;
            };
            if squad.role == SquadRole::Support || !is_active(squad) {
                continue;
            }
            if self.retreat(squad, ctx) {
                continue;
            }
            match squad.role {
                SquadRole::Assault => self.assault(squad, ctx),
                SquadRole::Flanker => self.flanker(squad, ctx),
                SquadRole::Scout => self.scout(squad, ctx),
                SquadRole::Artillery => self.artillery(squad, ctx),
                SquadRole::Support => {}
            }
        }

        let summaries: Vec<SquadSummary> = roster.iter().map(SquadSummary::from).collect();
        for &id in &ids {
            let Some(squad) = roster.get_mut(id) else {
                continue;
            };
            if squad.role == SquadRole::Support && is_active(squad) {
                self.support(squad, &summaries, ctx);
            }
        }

        for squad in roster.iter().filter(|s| is_active(s)) {
            self.enforce_cohesion(squad, ctx.units, ctx.intents);
        }
    }

    fn assault(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) {
        clear_invalid_target(squad, ctx.units);
        if squad.primary_target.is_none() {
            self.find_priority_target(squad, ctx);
        }
        let Some(target) = squad.primary_target.and_then(|t| ctx.units.position(t)) else {
            return;
        };

        if planar_distance(squad.centroid, target) <= self.config.assault_range {
            set_phase(squad, SquadPhase::Attacking, ctx.events);
            squad.set_move_goal(target);
            for &member in &squad.members {
                ctx.intents.push(member, UnitIntent::SetAggressive(true));
                ctx.intents.push(member, UnitIntent::SetDestination(target));
            }
        } else {
            set_phase(squad, SquadPhase::Advancing, ctx.events);
            let position = ctx.optimal_position(squad.faction, target, TacticalBehavior::Aggressive);
            squad.set_move_goal(position);
            ctx.intents
                .push_all(squad.members.iter().copied(), UnitIntent::SetDestination(position));
        }
    }

    fn flanker(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) {
        clear_invalid_target(squad, ctx.units);
        let Some(target) = squad.primary_target.and_then(|t| ctx.units.position(t)) else {
            self.find_priority_target(squad, ctx);
            return;
        };

        set_phase(squad, SquadPhase::Flanking, ctx.events);
        let [plus, minus] = flank_anchors(squad.centroid, target, self.config.flanker_spread_distance);
        let crowd = |anchor: Vec3| {
            ctx.units
                .hostiles_near(squad.faction, anchor, self.config.assault_range)
                .count()
        };
        let anchor = if crowd(plus) < crowd(minus) { plus } else { minus };

        squad.set_move_goal(anchor);
        let slots = flank_line(anchor, target, squad.members.len(), self.config.flanker_line_spacing);
        for (&member, slot) in squad.members.iter().zip(slots) {
            ctx.intents.push(member, UnitIntent::SetDestination(slot));
        }
    }

    fn artillery(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) {
        clear_invalid_target(squad, ctx.units);
        let Some(target) = squad.primary_target.and_then(|t| ctx.units.position(t)) else {
            self.find_priority_target(squad, ctx);
            return;
        };

        set_phase(squad, SquadPhase::Supporting, ctx.events);
        let position = ctx.optimal_position(squad.faction, target, TacticalBehavior::Support);
        squad.set_move_goal(position);
        for &member in &squad.members {
            ctx.intents.push(member, UnitIntent::SetDestination(position));
            ctx.intents.push(member, UnitIntent::ProvideSupportFire(true));
        }
    }

    fn scout(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) {
        set_phase(squad, SquadPhase::Scouting, ctx.events);
        let rally = *squad.rally_point.get_or_insert(squad.centroid);

        let waypoints = self.route.waypoint_count();
        if waypoints > 0 {
            let mut waypoint = self.route.waypoint(rally, squad.patrol_index);
            if planar_distance(squad.centroid, waypoint) <= self.config.scout_arrival_radius {
                squad.patrol_index = (squad.patrol_index + 1) % waypoints;
                waypoint = self.route.waypoint(rally, squad.patrol_index);
            }
            squad.set_move_goal(waypoint);
            ctx.intents
                .push_all(squad.members.iter().copied(), UnitIntent::SetDestination(waypoint));
        }

        let units = ctx.units;
        let sighted =
            units.hostiles_near(squad.faction, squad.centroid, self.config.scout_detection_radius);
        for hostile in sighted {
            if ctx
                .contacts
                .report(squad.faction, hostile.entity, hostile.position, ctx.now)
            {
                log::debug!("scout squad {} spotted {:?}", squad.id, hostile.entity);
                ctx.events.push(TacticalEvent::ContactReported {
                    squad: squad.id,
                    target: hostile.entity,
                    position: hostile.position,
                });
            }
        }
    }

    fn support(&self, squad: &mut Squad, summaries: &[SquadSummary], ctx: &mut SquadTickContext<'_>) {
        let faction = squad.faction;
        let find = |id: SquadId| {
            summaries
                .iter()
                .find(|s| s.id == id && s.faction == faction && s.live > 0)
        };
        if squad.support_target.is_some_and(|t| find(t).is_none()) {
            squad.support_target = None;
        }

        if squad.support_target.is_none() {
            let neediest = summaries
                .iter()
                .filter(|s| {
                    s.role == SquadRole::Assault
                        && s.phase == SquadPhase::Attacking
                        && s.faction == faction
                        && s.live > 0
                })
                .min_by(|a, b| {
                    a.average_health
                        .total_cmp(&b.average_health)
                        .then(a.id.cmp(&b.id))
                });
            if let Some(assault) = neediest {
                squad.support_target = Some(assault.id);
                ctx.events.push(TacticalEvent::SupportAssigned {
                    support: squad.id,
                    assault: assault.id,
                });
            }
        }

        let Some(supported) = squad.support_target.and_then(find) else {
            return;
        };

        set_phase(squad, SquadPhase::Supporting, ctx.events);
        let position = support_position(
            supported.centroid,
            supported.heading,
            squad.centroid,
            self.config.support_standoff,
        );
        squad.set_move_goal(position);
        for &member in &squad.members {
            ctx.intents.push(member, UnitIntent::SetDestination(position));
            ctx.intents.push(member, UnitIntent::ProvideSupportFire(true));
        }
    }

    /// Fall back while a combat squad is worn down. Returns `true` while retreating.
    fn retreat(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) -> bool {
        let Some(threshold) = self.config.retreat_health_threshold else {
            return false;
        };
        if !squad.role.is_combat() {
            return false;
        }
        let retreating = squad.average_health < threshold
            || (squad.phase == SquadPhase::Retreating && squad.average_health <= threshold);
        if !retreating {
            if squad.phase == SquadPhase::Retreating {
                set_phase(squad, SquadPhase::Advancing, ctx.events);
            }
            return false;
        }

        set_phase(squad, SquadPhase::Retreating, ctx.events);
        let nearest = nearest_hostile(ctx.units, squad.faction, squad.centroid);
        if let Some(hostile) = nearest {
            let away = flatten(squad.centroid - hostile.position)
                .try_normalize()
                .unwrap_or(Vec3::X);
            let fallback = squad.centroid + away * self.config.retreat_distance;
            squad.set_move_goal(fallback);
            for &member in &squad.members {
                ctx.intents.push(member, UnitIntent::SetAggressive(false));
                ctx.intents.push(member, UnitIntent::SetDestination(fallback));
            }
        }
        true
    }

    /// Pick the most threatening visible or reported hostile.
    fn find_priority_target(&self, squad: &mut Squad, ctx: &mut SquadTickContext<'_>) {
        let units = ctx.units;
        let mut candidates: Vec<&UnitView> = units
            .hostiles_near(squad.faction, squad.centroid, self.config.target_detection_radius)
            .collect();
        for contact in ctx.contacts.known_to(squad.faction, ctx.now) {
            if let Some(view) = units.get(contact.unit) {
                if view.faction.is_hostile_to(squad.faction)
                    && !candidates.iter().any(|c| c.entity == view.entity)
                {
                    candidates.push(view);
                }
            }
        }

        if let Some(target) = ctx.threat.priority_target(candidates, squad.centroid) {
            squad.primary_target = Some(target.entity);
            log::debug!("squad {} targets {:?}", squad.id, target.entity);
            ctx.events.push(TacticalEvent::TargetAcquired {
                squad: squad.id,
                target: target.entity,
            });
        }
    }

    fn enforce_cohesion(&self, squad: &Squad, units: &UnitRegistry, intents: &mut IntentBuffer) {
        if squad.members.len() <= 1 {
            return;
        }
        for &member in &squad.members {
            let Some(view) = units.get(member) else {
                continue;
            };
            if let Some(destination) = cohesion_pull(
                view.position,
                squad.centroid,
                self.config.cohesion_radius,
                squad.cohesion_strength,
            ) {
                intents.push(member, UnitIntent::SetDestination(destination));
            }
        }
    }
}

/// Squads with live members that are not held by an ambush.
fn is_active(squad: &Squad) -> bool {
    !squad.is_inert() && squad.ambush.is_none()
}

pub(crate) fn set_phase(squad: &mut Squad, phase: SquadPhase, events: &mut Vec<TacticalEvent>) {
    if squad.phase != phase {
        log::debug!("squad {}: {:?} -> {:?}", squad.id, squad.phase, phase);
        events.push(TacticalEvent::PhaseChanged {
            squad: squad.id,
            from: squad.phase,
            to: phase,
        });
        squad.phase = phase;
    }
}

fn clear_invalid_target(squad: &mut Squad, units: &UnitRegistry) {
    let valid = squad
        .primary_target
        .and_then(|t| units.get(t))
        .is_some_and(|view| view.faction.is_hostile_to(squad.faction));
    if !valid {
        squad.primary_target = None;
    }
}

pub(crate) fn nearest_hostile(units: &UnitRegistry, faction: Faction, position: Vec3) -> Option<&UnitView> {
    units.hostiles_of(faction).min_by(|a, b| {
        planar_distance(a.position, position)
            .total_cmp(&planar_distance(b.position, position))
            .then(a.entity.to_bits().cmp(&b.entity.to_bits()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScoringConfig, ThreatConfig, TerrainAnalysisConfig};
    use crate::coordination::AmbushId;
    use crate::test_support::{move_unit, set_health, spawn_unit};
    use engine_core::{Entity, UnitKind, World};

    struct Harness {
        terrain: TerrainCache,
        scorer: PositionScorer,
        threat: ThreatAssessor,
        contacts: ContactBoard,
        intents: IntentBuffer,
        events: Vec<TacticalEvent>,
        now: f32,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                terrain: TerrainCache::new(TerrainAnalysisConfig::default()),
                scorer: PositionScorer::new(ScoringConfig::default()),
                threat: ThreatAssessor::new(ThreatConfig::default()),
                contacts: ContactBoard::new(5.0),
                intents: IntentBuffer::new(),
                events: Vec::new(),
                now: 0.0,
            }
        }

        fn squad(&mut self, roster: &mut SquadRoster, role: SquadRole, members: &[Entity]) -> SquadId {
            let id = roster.create(role, Faction(0));
            for &m in members {
                roster.assign(m, id, &mut self.intents).expect("assign");
            }
            self.intents.drain();
            id
        }

        fn run(&mut self, coordinator: &SquadCoordinator, roster: &mut SquadRoster, world: &World) {
            let units = UnitRegistry::snapshot(world);
            let mut ctx = SquadTickContext {
                units: &units,
                terrain: &mut self.terrain,
                scorer: &self.scorer,
                threat: &self.threat,
                contacts: &mut self.contacts,
                intents: &mut self.intents,
                events: &mut self.events,
                now: self.now,
            };
            coordinator.update(roster, &mut ctx);
        }

        fn reset(&mut self) {
            self.intents.drain();
            self.events.clear();
        }
    }

    fn close(a: Option<Vec3>, b: Vec3) -> bool {
        a.is_some_and(|a| (a - b).length() < 1e-3)
    }

    fn infantry(world: &mut World, x: f32, z: f32, faction: u8) -> Entity {
        spawn_unit(world, Vec3::new(x, 0.0, z), faction, UnitKind::Infantry)
    }

    #[test]
    fn assault_attacks_target_in_range() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let b = infantry(&mut world, 2.0, 0.0, 0);
        let hostile = infantry(&mut world, 10.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a, b]);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);

        let squad = roster.get(id).expect("squad");
        assert_eq!(squad.phase, SquadPhase::Attacking);
        assert_eq!(squad.primary_target, Some(hostile));
        for unit in [a, b] {
            assert!(h.intents.for_unit(unit).any(|i| *i == UnitIntent::SetAggressive(true)));
            assert_eq!(h.intents.last_destination(unit), Some(Vec3::new(10.0, 0.0, 0.0)));
        }
        assert!(h.events.contains(&TacticalEvent::TargetAcquired { squad: id, target: hostile }));
        assert!(h.events.contains(&TacticalEvent::PhaseChanged {
            squad: id,
            from: SquadPhase::Advancing,
            to: SquadPhase::Attacking,
        }));
    }

    #[test]
    fn assault_advances_on_distant_target() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        infantry(&mut world, 50.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);

        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Advancing));
        // Terrain is not sampled yet, so the target itself is the best known spot.
        assert_eq!(h.intents.last_destination(a), Some(Vec3::new(50.0, 0.0, 0.0)));
        assert!(h.terrain.queued_jobs() > 0);
    }

    #[test]
    fn no_visible_target_means_no_orders() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        infantry(&mut world, 200.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert!(h.intents.is_empty());
        assert_eq!(roster.get(id).and_then(|s| s.primary_target), None);
    }

    #[test]
    fn scout_contacts_feed_target_search() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let far = infantry(&mut world, 200.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);
        h.contacts.report(Faction(0), far, Vec3::new(200.0, 0.0, 0.0), 0.0);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert_eq!(roster.get(id).and_then(|s| s.primary_target), Some(far));
    }

    #[test]
    fn dead_target_is_replaced() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let old = infantry(&mut world, 5.0, 0.0, 1);
        let new = infantry(&mut world, 8.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);
        if let Some(s) = roster.get_mut(id) {
            s.primary_target = Some(old);
        }
        set_health(&mut world, old, 0.0);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert_eq!(roster.get(id).and_then(|s| s.primary_target), Some(new));
    }

    #[test]
    fn flankers_take_the_quieter_side_in_a_centred_line() {
        let mut world = World::new();
        let members: Vec<Entity> = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, z)| infantry(&mut world, x, z, 0))
            .collect();
        let target = infantry(&mut world, 20.0, 0.0, 1);
        // Crowd the +z flank.
        infantry(&mut world, 20.0, 14.0, 1);
        infantry(&mut world, 22.0, 14.0, 1);

        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Flanker, &members);
        if let Some(s) = roster.get_mut(id) {
            s.primary_target = Some(target);
        }

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);

        let squad = roster.get(id).expect("squad");
        assert_eq!(squad.phase, SquadPhase::Flanking);
        assert!(close(squad.move_goal, Vec3::new(20.0, 0.0, -12.0)));
        let expected = [26.0, 22.0, 18.0, 14.0];
        for (unit, x) in members.iter().zip(expected) {
            assert!(close(h.intents.last_destination(*unit), Vec3::new(x, 0.0, -12.0)));
        }
    }

    #[test]
    fn flank_tie_takes_negative_side() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let target = infantry(&mut world, 20.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Flanker, &[a]);
        if let Some(s) = roster.get_mut(id) {
            s.primary_target = Some(target);
        }
        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert!(close(h.intents.last_destination(a), Vec3::new(20.0, 0.0, -12.0)));
    }

    #[test]
    fn flanker_without_target_searches_and_idles() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let hostile = infantry(&mut world, 20.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Flanker, &[a]);

        let coordinator = SquadCoordinator::new(SquadConfig::default());
        h.run(&coordinator, &mut roster, &world);
        assert_eq!(roster.get(id).and_then(|s| s.primary_target), Some(hostile));
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Advancing));
        assert!(h.intents.is_empty());

        h.run(&coordinator, &mut roster, &world);
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Flanking));
    }

    #[test]
    fn support_stands_behind_attacking_assault() {
        let mut world = World::new();
        let lead = infantry(&mut world, 0.0, 0.0, 0);
        let medic = infantry(&mut world, -30.0, 5.0, 0);
        infantry(&mut world, 10.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let assault = h.squad(&mut roster, SquadRole::Assault, &[lead]);
        let support = h.squad(&mut roster, SquadRole::Support, &[medic]);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);

        let squad = roster.get(support).expect("support");
        assert_eq!(squad.support_target, Some(assault));
        assert_eq!(squad.phase, SquadPhase::Supporting);
        assert!(close(h.intents.last_destination(medic), Vec3::new(-10.0, 0.0, 0.0)));
        assert!(h.intents.for_unit(medic).any(|i| *i == UnitIntent::ProvideSupportFire(true)));
        assert!(h.events.contains(&TacticalEvent::SupportAssigned { support, assault }));
    }

    #[test]
    fn support_picks_weakest_attacking_assault() {
        let mut world = World::new();
        let strong = infantry(&mut world, 0.0, 0.0, 0);
        let weak = infantry(&mut world, 0.0, 40.0, 0);
        let medic = infantry(&mut world, -5.0, 0.0, 0);
        infantry(&mut world, 5.0, 0.0, 1);
        infantry(&mut world, 5.0, 40.0, 1);
        set_health(&mut world, weak, 40.0);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        h.squad(&mut roster, SquadRole::Assault, &[strong]);
        let weak_squad = h.squad(&mut roster, SquadRole::Assault, &[weak]);
        let support = h.squad(&mut roster, SquadRole::Support, &[medic]);

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert_eq!(roster.get(support).and_then(|s| s.support_target), Some(weak_squad));
    }

    #[test]
    fn support_drops_target_that_went_inert() {
        let mut world = World::new();
        let lead = infantry(&mut world, 0.0, 0.0, 0);
        let medic = infantry(&mut world, -30.0, 0.0, 0);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let assault = h.squad(&mut roster, SquadRole::Assault, &[lead]);
        let support = h.squad(&mut roster, SquadRole::Support, &[medic]);
        if let Some(s) = roster.get_mut(support) {
            s.support_target = Some(assault);
        }
        world.despawn(lead).expect("despawn");

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert_eq!(roster.get(support).and_then(|s| s.support_target), None);
        assert!(h.intents.last_destination(medic).is_none());
    }

    #[test]
    fn scout_patrols_ring_and_reports_contacts() {
        let mut world = World::new();
        let eye = infantry(&mut world, 0.0, 0.0, 0);
        let hostile = infantry(&mut world, 30.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Scout, &[eye]);
        let coordinator = SquadCoordinator::new(SquadConfig::default());

        h.run(&coordinator, &mut roster, &world);
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Scouting));
        assert!(close(h.intents.last_destination(eye), Vec3::new(40.0, 0.0, 0.0)));
        assert_eq!(
            h.events
                .iter()
                .filter(|e| matches!(e, TacticalEvent::ContactReported { target, .. } if *target == hostile))
                .count(),
            1
        );

        h.reset();
        move_unit(&mut world, eye, Vec3::new(38.0, 0.0, 0.0));
        h.now = 0.5;
        h.run(&coordinator, &mut roster, &world);
        let next = PatrolRing::new(40.0, 6).waypoint(Vec3::ZERO, 1);
        assert!(close(h.intents.last_destination(eye), next));
        assert!(!h
            .events
            .iter()
            .any(|e| matches!(e, TacticalEvent::ContactReported { .. })));
    }

    #[test]
    fn worn_down_squad_retreats_when_enabled() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        infantry(&mut world, 10.0, 0.0, 1);
        set_health(&mut world, a, 30.0);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);

        let config = SquadConfig {
            retreat_health_threshold: Some(0.5),
            ..Default::default()
        };
        let coordinator = SquadCoordinator::new(config);
        h.run(&coordinator, &mut roster, &world);
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Retreating));
        assert!(close(h.intents.last_destination(a), Vec3::new(-30.0, 0.0, 0.0)));

        h.reset();
        set_health(&mut world, a, 80.0);
        h.run(&coordinator, &mut roster, &world);
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Attacking));
    }

    #[test]
    fn retreat_is_off_by_default() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        infantry(&mut world, 10.0, 0.0, 1);
        set_health(&mut world, a, 10.0);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let id = h.squad(&mut roster, SquadRole::Assault, &[a]);
        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert_eq!(roster.get(id).map(|s| s.phase), Some(SquadPhase::Attacking));
    }

    #[test]
    fn stragglers_are_pulled_back() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let b = infantry(&mut world, 40.0, 0.0, 0);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        h.squad(&mut roster, SquadRole::Assault, &[a, b]);
        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert!(close(h.intents.last_destination(a), Vec3::new(15.0, 0.0, 0.0)));
        assert!(close(h.intents.last_destination(b), Vec3::new(25.0, 0.0, 0.0)));
    }

    #[test]
    fn ambush_held_and_inert_squads_issue_nothing() {
        let mut world = World::new();
        let a = infantry(&mut world, 0.0, 0.0, 0);
        let gone = infantry(&mut world, 1.0, 0.0, 0);
        infantry(&mut world, 10.0, 0.0, 1);
        let mut roster = SquadRoster::new(8);
        let mut h = Harness::new();
        let held = h.squad(&mut roster, SquadRole::Assault, &[a]);
        h.squad(&mut roster, SquadRole::Assault, &[gone]);
        if let Some(s) = roster.get_mut(held) {
            s.ambush = Some(AmbushId(1));
        }
        world.despawn(gone).expect("despawn");

        h.run(&SquadCoordinator::new(SquadConfig::default()), &mut roster, &world);
        assert!(h.intents.is_empty());
        assert!(h.events.is_empty());
    }
}
