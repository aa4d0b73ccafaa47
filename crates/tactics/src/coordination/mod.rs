//! Cross-squad coordination: support assignment, ambushes and bunker shielding.
//!
//! Runs after every squad has stepped its own state machine, so it always sees the
//! phases decided this tick.

mod ambush;
mod shield;
mod support;

use std::collections::BTreeMap;

use engine_core::{Entity, Faction, Vec3};

use crate::config::CoordinationConfig;
use crate::director::TacticalEvent;
use crate::error::TacticsError;
use crate::intent::IntentBuffer;
use crate::registry::UnitRegistry;
use crate::squad::{SquadId, SquadRoster};
use crate::threat::ThreatAssessor;

pub use ambush::{AmbushCoordination, AmbushId};
use ambush::AmbushOutcome;
pub use shield::{ShieldNetwork, ShieldPairing, SHIELD_SOURCE};
pub use support::assign_support;

/// Inputs of one coordination pass.
pub struct CoordinationContext<'a> {
    pub units: &'a UnitRegistry,
    pub threat: &'a ThreatAssessor,
    pub intents: &'a mut IntentBuffer,
    pub events: &'a mut Vec<TacticalEvent>,
    /// Factions whose bunkers are managed.
    pub managed: &'a [Faction],
    /// Game seconds since the previous pass.
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub struct InterSquadCoordinator {
    config: CoordinationConfig,
    ambushes: BTreeMap<AmbushId, AmbushCoordination>,
    next_ambush: u32,
    shields: ShieldNetwork,
}

impl InterSquadCoordinator {
    pub fn new(config: CoordinationConfig) -> Self {
        Self {
            shields: ShieldNetwork::new(config.clone()),
            config,
            ambushes: BTreeMap::new(),
            next_ambush: 1,
        }
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Set an ambush around `center`, led by `squad`. Nearby friendly squads are recruited
    /// on each update, once their centroids reflect where their members stand.
    pub fn initiate_ambush(
        &mut self,
        roster: &mut SquadRoster,
        squad: SquadId,
        center: Vec3,
    ) -> Result<AmbushId, TacticsError> {
        let leader = roster.get_mut(squad).ok_or(TacticsError::UnknownSquad(squad))?;
        if leader.is_inert() {
            return Err(TacticsError::InertSquad(squad));
        }
        if let Some(ambush) = leader.ambush {
            return Err(TacticsError::AlreadyInAmbush { squad, ambush });
        }

        let id = AmbushId(self.next_ambush);
        self.next_ambush += 1;
        leader.ambush = Some(id);
        let ambush = AmbushCoordination::new(
            id,
            leader.faction,
            squad,
            center,
            self.config.ambush_trigger_radius,
        );
        log::info!("ambush {} set at {:?} by squad {}", id, center, squad);
        self.ambushes.insert(id, ambush);
        Ok(id)
    }

    /// Call off an ambush; participants may fire again.
    pub fn cancel_ambush(
        &mut self,
        roster: &mut SquadRoster,
        id: AmbushId,
        intents: &mut IntentBuffer,
    ) -> Result<(), TacticsError> {
        let mut ambush = self.ambushes.remove(&id).ok_or(TacticsError::UnknownAmbush(id))?;
        ambush.release_all(roster, intents);
        log::info!("ambush {} cancelled", id);
        Ok(())
    }

    pub fn ambush(&self, id: AmbushId) -> Option<&AmbushCoordination> {
        self.ambushes.get(&id)
    }

    pub fn ambushes(&self) -> impl Iterator<Item = &AmbushCoordination> + '_ {
        self.ambushes.values()
    }

    pub fn shields(&self) -> &ShieldNetwork {
        &self.shields
    }

    pub fn report_ammo_spent(&mut self, artillery: Entity, amount: f32) {
        self.shields.report_ammo_spent(artillery, amount);
    }

    pub fn update(&mut self, roster: &mut SquadRoster, ctx: &mut CoordinationContext<'_>) {
        assign_support(roster, self.config.support_reassign_hysteresis, ctx.events);

        let ids: Vec<AmbushId> = self.ambushes.keys().copied().collect();
        for id in ids {
            let Some(ambush) = self.ambushes.get_mut(&id) else {
                continue;
            };
            match ambush.step(roster, ctx.units, &self.config, ctx.intents, ctx.events) {
                AmbushOutcome::Holding => {}
                AmbushOutcome::Triggered(_) => {
                    self.ambushes.remove(&id);
                }
                AmbushOutcome::Disbanded => {
                    log::debug!("ambush {} has no participants left", id);
                    self.ambushes.remove(&id);
                }
            }
        }

        self.shields.update(
            ctx.units,
            ctx.managed,
            ctx.threat,
            ctx.intents,
            ctx.events,
            ctx.dt,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreatConfig;
    use crate::intent::UnitIntent;
    use crate::squad::{SquadPhase, SquadRole};
    use crate::test_support::{move_unit, spawn_unit};
    use engine_core::{UnitKind, World};

    struct Field {
        world: World,
        roster: SquadRoster,
        coordinator: InterSquadCoordinator,
        threat: ThreatAssessor,
        intents: IntentBuffer,
        events: Vec<TacticalEvent>,
    }

    impl Field {
        fn new() -> Self {
            Self {
                world: World::new(),
                roster: SquadRoster::new(8),
                coordinator: InterSquadCoordinator::new(CoordinationConfig::default()),
                threat: ThreatAssessor::new(ThreatConfig::default()),
                intents: IntentBuffer::new(),
                events: Vec::new(),
            }
        }

        fn squad(&mut self, role: SquadRole, at: Vec3, faction: u8) -> (SquadId, Entity) {
            let unit = spawn_unit(&mut self.world, at, faction, UnitKind::Infantry);
            let id = self.roster.create(role, Faction(faction));
            self.roster
                .assign(unit, id, &mut IntentBuffer::new())
                .expect("assign");
            (id, unit)
        }

        fn tick(&mut self) {
            let units = UnitRegistry::snapshot(&self.world);
            self.roster.refresh(&units);
            let mut ctx = CoordinationContext {
                units: &units,
                threat: &self.threat,
                intents: &mut self.intents,
                events: &mut self.events,
                managed: &[Faction(0)],
                dt: 0.5,
            };
            self.coordinator.update(&mut self.roster, &mut ctx);
        }

        fn refresh(&mut self) {
            self.roster.refresh(&UnitRegistry::snapshot(&self.world));
        }
    }

    #[test]
    fn ambush_recruits_nearby_friendlies_only() {
        let mut f = Field::new();
        let (leader, _) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        let (near, _) = f.squad(SquadRole::Flanker, Vec3::new(30.0, 0.0, 0.0), 0);
        let (far, _) = f.squad(SquadRole::Flanker, Vec3::new(90.0, 0.0, 0.0), 0);
        let (enemy, _) = f.squad(SquadRole::Assault, Vec3::new(40.0, 0.0, 40.0), 1);
        f.refresh();

        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::new(10.0, 0.0, 0.0))
            .expect("ambush");
        assert_eq!(f.coordinator.ambush(id).map(|a| a.participants.len()), Some(1));
        f.tick();

        let ambush = f.coordinator.ambush(id).expect("exists");
        assert!(ambush.participants.contains(&leader));
        assert!(ambush.participants.contains(&near));
        assert!(!ambush.participants.contains(&far));
        assert!(!ambush.participants.contains(&enemy));
        assert_eq!(f.roster.get(near).and_then(|s| s.ambush), Some(id));
    }

    #[test]
    fn squads_assigned_before_any_refresh_are_judged_by_real_positions() {
        let mut f = Field::new();
        let (leader, _) = f.squad(SquadRole::Assault, Vec3::new(10.0, 0.0, 0.0), 0);
        let (distant, _) = f.squad(SquadRole::Flanker, Vec3::new(400.0, 0.0, 0.0), 0);
        let (close, _) = f.squad(SquadRole::Flanker, Vec3::new(20.0, 0.0, 0.0), 0);

        // Centroids still sit at the origin here.
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::new(10.0, 0.0, 0.0))
            .expect("ambush");
        assert_eq!(f.roster.get(distant).and_then(|s| s.ambush), None);

        f.tick();
        let ambush = f.coordinator.ambush(id).expect("exists");
        assert!(ambush.participants.contains(&close));
        assert!(!ambush.participants.contains(&distant));
        assert_eq!(f.roster.get(distant).and_then(|s| s.ambush), None);
    }

    #[test]
    fn initiate_rejects_bad_squads() {
        let mut f = Field::new();
        let (leader, _) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        f.refresh();
        assert_eq!(
            f.coordinator.initiate_ambush(&mut f.roster, SquadId(99), Vec3::ZERO),
            Err(TacticsError::UnknownSquad(SquadId(99)))
        );
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::ZERO)
            .expect("first");
        assert_eq!(
            f.coordinator.initiate_ambush(&mut f.roster, leader, Vec3::ZERO),
            Err(TacticsError::AlreadyInAmbush { squad: leader, ambush: id })
        );

        let lonely = f.roster.create(SquadRole::Scout, Faction(0));
        assert_eq!(
            f.coordinator.initiate_ambush(&mut f.roster, lonely, Vec3::ZERO),
            Err(TacticsError::InertSquad(lonely))
        );
    }

    #[test]
    fn held_ambush_places_squads_on_ring_with_fire_held() {
        let mut f = Field::new();
        let (leader, a) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        let (_, b) = f.squad(SquadRole::Flanker, Vec3::new(5.0, 0.0, 0.0), 0);
        f.refresh();
        let center = Vec3::new(10.0, 0.0, 10.0);
        f.coordinator
            .initiate_ambush(&mut f.roster, leader, center)
            .expect("ambush");
        f.tick();

        // Two participants: slots at angle 0 and pi.
        let a_slot = f.intents.last_destination(a).expect("a placed");
        let b_slot = f.intents.last_destination(b).expect("b placed");
        assert!((a_slot - Vec3::new(25.0, 0.0, 10.0)).length() < 1e-3);
        assert!((b_slot - Vec3::new(-5.0, 0.0, 10.0)).length() < 1e-3);
        for unit in [a, b] {
            assert!(f.intents.for_unit(unit).any(|i| *i == UnitIntent::HoldFire(true)));
            assert!(f.intents.for_unit(unit).any(|i| *i == UnitIntent::SetAggressive(false)));
        }
        assert_eq!(f.coordinator.ambushes().count(), 1);
    }

    #[test]
    fn hostile_squad_in_trigger_radius_springs_ambush() {
        let mut f = Field::new();
        let (leader, a) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        let center = Vec3::new(10.0, 0.0, 0.0);
        f.refresh();
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, center)
            .expect("ambush");
        let (_, intruder) = f.squad(SquadRole::Assault, Vec3::new(60.0, 0.0, 0.0), 1);
        f.tick();
        assert!(f.coordinator.ambush(id).is_some());

        move_unit(&mut f.world, intruder, Vec3::new(25.0, 0.0, 0.0));
        f.intents.drain();
        f.tick();

        assert!(f.coordinator.ambush(id).is_none());
        let squad = f.roster.get(leader).expect("leader");
        assert_eq!(squad.phase, SquadPhase::Attacking);
        assert_eq!(squad.ambush, None);
        let orders: Vec<_> = f.intents.for_unit(a).copied().collect();
        assert_eq!(
            orders,
            vec![
                UnitIntent::HoldFire(false),
                UnitIntent::SetAggressive(true),
                UnitIntent::SetDestination(Vec3::new(25.0, 0.0, 0.0)),
            ]
        );
        assert!(f.events.contains(&TacticalEvent::AmbushTriggered {
            ambush: id,
            intruder: Vec3::new(25.0, 0.0, 0.0),
        }));
    }

    #[test]
    fn sprung_ambush_is_not_rearmed_when_intruder_leaves() {
        let mut f = Field::new();
        let (leader, a) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        f.refresh();
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::new(10.0, 0.0, 0.0))
            .expect("ambush");
        let (_, intruder) = f.squad(SquadRole::Assault, Vec3::new(15.0, 0.0, 0.0), 1);
        f.tick();
        assert!(f.coordinator.ambush(id).is_none());

        move_unit(&mut f.world, intruder, Vec3::new(300.0, 0.0, 0.0));
        f.intents.drain();
        f.events.clear();
        f.tick();
        f.tick();

        assert_eq!(f.coordinator.ambushes().count(), 0);
        let squad = f.roster.get(leader).expect("leader");
        assert_eq!(squad.ambush, None);
        assert_eq!(squad.phase, SquadPhase::Attacking);
        assert!(!f.intents.for_unit(a).any(|i| *i == UnitIntent::HoldFire(true)));
        assert!(!f
            .events
            .iter()
            .any(|e| matches!(e, TacticalEvent::AmbushTriggered { .. })));
    }

    #[test]
    fn lone_hostile_unit_also_triggers() {
        let mut f = Field::new();
        let (leader, _) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        f.refresh();
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::new(10.0, 0.0, 0.0))
            .expect("ambush");
        spawn_unit(&mut f.world, Vec3::new(12.0, 0.0, 5.0), 1, UnitKind::Armor);
        f.tick();
        assert!(f.coordinator.ambush(id).is_none());
    }

    #[test]
    fn straying_participant_is_released() {
        let mut f = Field::new();
        let (leader, _) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        let (other, b) = f.squad(SquadRole::Flanker, Vec3::new(20.0, 0.0, 0.0), 0);
        f.refresh();
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::ZERO)
            .expect("ambush");
        f.tick();
        assert!(f.coordinator.ambush(id).is_some_and(|a| a.participants.contains(&other)));

        move_unit(&mut f.world, b, Vec3::new(120.0, 0.0, 0.0));
        f.tick();
        assert!(f.coordinator.ambush(id).is_some_and(|a| !a.participants.contains(&other)));
        assert_eq!(f.roster.get(other).and_then(|s| s.ambush), None);
        assert!(f.intents.for_unit(b).any(|i| *i == UnitIntent::HoldFire(false)));
    }

    #[test]
    fn cancel_releases_participants() {
        let mut f = Field::new();
        let (leader, a) = f.squad(SquadRole::Assault, Vec3::ZERO, 0);
        f.refresh();
        let id = f
            .coordinator
            .initiate_ambush(&mut f.roster, leader, Vec3::ZERO)
            .expect("ambush");
        f.coordinator
            .cancel_ambush(&mut f.roster, id, &mut f.intents)
            .expect("cancel");
        assert_eq!(f.roster.get(leader).and_then(|s| s.ambush), None);
        assert_eq!(f.intents.for_unit(a).last(), Some(&UnitIntent::HoldFire(false)));
        assert_eq!(
            f.coordinator.cancel_ambush(&mut f.roster, id, &mut f.intents),
            Err(TacticsError::UnknownAmbush(id))
        );
    }
}
