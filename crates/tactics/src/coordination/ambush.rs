//! Ambush coordination: gather friendly squads on a ring around a kill zone, hold fire,
//! and spring the trap when a hostile walks in.

use std::collections::BTreeSet;
use std::fmt;

use engine_core::{planar_distance, Faction, Vec3};

use crate::config::CoordinationConfig;
use crate::director::TacticalEvent;
use crate::intent::{IntentBuffer, UnitIntent};
use crate::registry::UnitRegistry;
use crate::squad::formation::ring_slots;
use crate::squad::{set_phase, SquadId, SquadPhase, SquadRoster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmbushId(pub u32);

impl fmt::Display for AmbushId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbushCoordination {
    pub id: AmbushId,
    pub faction: Faction,
    /// Squad that set the ambush; never released for straying.
    pub initiator: SquadId,
    pub participants: BTreeSet<SquadId>,
    pub center: Vec3,
    pub trigger_radius: f32,
    pub hold_fire: bool,
}

/// What a tick did to an ambush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AmbushOutcome {
    Holding,
    Triggered(Vec3),
    /// No participants left.
    Disbanded,
}

impl AmbushCoordination {
    pub(crate) fn new(
        id: AmbushId,
        faction: Faction,
        initiator: SquadId,
        center: Vec3,
        trigger_radius: f32,
    ) -> Self {
        Self {
            id,
            faction,
            initiator,
            participants: BTreeSet::from([initiator]),
            center,
            trigger_radius,
            hold_fire: true,
        }
    }

    pub(crate) fn step(
        &mut self,
        roster: &mut SquadRoster,
        units: &UnitRegistry,
        config: &CoordinationConfig,
        intents: &mut IntentBuffer,
        events: &mut Vec<TacticalEvent>,
    ) -> AmbushOutcome {
        self.prune(roster);
        self.recruit(roster, config.ambush_recruit_radius);
        self.release_strays(roster, config.ambush_recruit_radius, intents);
        if self.participants.is_empty() {
            return AmbushOutcome::Disbanded;
        }

        match self.find_intruder(roster, units) {
            Some(intruder) => {
                self.spring(roster, intruder, intents, events);
                AmbushOutcome::Triggered(intruder)
            }
            None => {
                self.hold(roster, config.ambush_ring_radius, intents);
                AmbushOutcome::Holding
            }
        }
    }

    /// Enrol free friendly squads near the kill zone.
    fn recruit(&mut self, roster: &mut SquadRoster, radius: f32) {
        for squad in roster.iter_mut() {
            if squad.faction == self.faction
                && squad.ambush.is_none()
                && !squad.is_inert()
                && planar_distance(squad.centroid, self.center) <= radius
            {
                squad.ambush = Some(self.id);
                self.participants.insert(squad.id);
                log::debug!("squad {} joins ambush {}", squad.id, self.id);
            }
        }
    }

    /// Free every participant and let it fire again.
    pub(crate) fn release_all(&mut self, roster: &mut SquadRoster, intents: &mut IntentBuffer) {
        for id in std::mem::take(&mut self.participants) {
            if let Some(squad) = roster.get_mut(id) {
                squad.ambush = None;
                intents.push_all(squad.members.iter().copied(), UnitIntent::HoldFire(false));
            }
        }
    }

    /// Forget participants that were removed or lost every member.
    fn prune(&mut self, roster: &mut SquadRoster) {
        let id = self.id;
        self.participants.retain(|&p| match roster.get_mut(p) {
            Some(squad) if !squad.is_inert() && squad.ambush == Some(id) => true,
            Some(squad) => {
                if squad.ambush == Some(id) {
                    squad.ambush = None;
                }
                false
            }
            None => false,
        });
    }

    fn release_strays(&mut self, roster: &mut SquadRoster, radius: f32, intents: &mut IntentBuffer) {
        let strays: Vec<SquadId> = self
            .participants
            .iter()
            .copied()
            .filter(|&p| p != self.initiator)
            .filter(|&p| {
                roster
                    .get(p)
                    .is_some_and(|s| planar_distance(s.centroid, self.center) > radius)
            })
            .collect();
        for id in strays {
            self.participants.remove(&id);
            if let Some(squad) = roster.get_mut(id) {
                squad.ambush = None;
                intents.push_all(squad.members.iter().copied(), UnitIntent::HoldFire(false));
                log::debug!("squad {} strayed from ambush {}", id, self.id);
            }
        }
    }

    /// Closest hostile squad centroid, or unsquadded hostile unit, inside the trigger radius.
    fn find_intruder(&self, roster: &SquadRoster, units: &UnitRegistry) -> Option<Vec3> {
        let squads = roster
            .iter()
            .filter(|s| s.faction.is_hostile_to(self.faction) && !s.is_inert())
            .map(|s| s.centroid);
        let loners = units
            .hostiles_near(self.faction, self.center, self.trigger_radius)
            .filter(|u| roster.squad_of(u.entity).is_none())
            .map(|u| u.position);
        squads
            .chain(loners)
            .filter(|&p| planar_distance(p, self.center) <= self.trigger_radius)
            .min_by(|a, b| {
                planar_distance(*a, self.center).total_cmp(&planar_distance(*b, self.center))
            })
    }

    fn hold(&self, roster: &mut SquadRoster, ring_radius: f32, intents: &mut IntentBuffer) {
        let slots = ring_slots(self.center, ring_radius, self.participants.len());
        for (&id, slot) in self.participants.iter().zip(slots) {
            let Some(squad) = roster.get_mut(id) else {
                continue;
            };
            squad.set_move_goal(slot);
            for &member in &squad.members {
                intents.push(member, UnitIntent::SetDestination(slot));
                intents.push(member, UnitIntent::SetAggressive(false));
                intents.push(member, UnitIntent::HoldFire(self.hold_fire));
            }
        }
    }

    fn spring(
        &mut self,
        roster: &mut SquadRoster,
        intruder: Vec3,
        intents: &mut IntentBuffer,
        events: &mut Vec<TacticalEvent>,
    ) {
        log::info!("ambush {} triggered at {:?}", self.id, intruder);
        self.hold_fire = false;
        for &id in &self.participants {
            let Some(squad) = roster.get_mut(id) else {
                continue;
            };
            squad.ambush = None;
            set_phase(squad, SquadPhase::Attacking, events);
            squad.set_move_goal(intruder);
            for &member in &squad.members {
                intents.push(member, UnitIntent::HoldFire(false));
                intents.push(member, UnitIntent::SetAggressive(true));
                intents.push(member, UnitIntent::SetDestination(intruder));
            }
        }
        events.push(TacticalEvent::AmbushTriggered {
            ambush: self.id,
            intruder,
        });
    }
}
