//! Squads: membership, per-role state machines, formation geometry and scouting.

mod coordinator;
pub mod formation;
mod scout;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use engine_core::{flatten, Entity, Faction, Vec3};

use crate::coordination::AmbushId;
use crate::error::TacticsError;
use crate::intent::{IntentBuffer, UnitIntent};
use crate::registry::UnitRegistry;

pub use coordinator::{SquadCoordinator, SquadTickContext};
pub(crate) use coordinator::{nearest_hostile, set_phase};
pub use scout::{Contact, ContactBoard, PatrolRing, ReconRoute};

/// Squad identifier. Assigned in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SquadId(pub u32);

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SquadRole {
    /// Main attack force.
    Assault,
    /// Swings around the target's side.
    Flanker,
    /// Trails an attacking assault squad and covers it.
    Support,
    /// Patrols and reports contacts.
    Scout,
    /// Long-range fire from a good position near the target.
    Artillery,
}

impl SquadRole {
    /// Roles that fight directly and may fall back when worn down.
    pub fn is_combat(self) -> bool {
        matches!(self, SquadRole::Assault | SquadRole::Flanker | SquadRole::Artillery)
    }

    /// Behaviour toggles a unit receives when it joins a squad of this role.
    fn configuration(self) -> [UnitIntent; 2] {
        match self {
            SquadRole::Assault => [UnitIntent::SetAggressive(true), UnitIntent::EnableFlanking(false)],
            SquadRole::Flanker => [UnitIntent::SetAggressive(true), UnitIntent::EnableFlanking(true)],
            SquadRole::Support => [
                UnitIntent::SetAggressive(false),
                UnitIntent::ProvideSupportFire(true),
            ],
            SquadRole::Scout => [UnitIntent::SetAggressive(false), UnitIntent::EnableFlanking(true)],
            SquadRole::Artillery => [
                UnitIntent::SetAggressive(true),
                UnitIntent::ProvideSupportFire(true),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SquadPhase {
    #[default]
    Advancing,
    Attacking,
    Flanking,
    Supporting,
    Retreating,
    Scouting,
}

#[derive(Debug, Clone)]
pub struct Squad {
    pub id: SquadId,
    pub role: SquadRole,
    pub faction: Faction,
    /// Insertion ordered. Dead members are pruned at the start of every tick.
    pub members: Vec<Entity>,
    /// Mean position of live members; zero when there are none.
    pub centroid: Vec3,
    /// Unit XZ direction towards the last squad-level destination, or zero.
    pub heading: Vec3,
    /// Mean health fraction of live members.
    pub average_health: f32,
    pub primary_target: Option<Entity>,
    pub support_target: Option<SquadId>,
    pub phase: SquadPhase,
    pub cohesion_strength: f32,
    pub move_goal: Option<Vec3>,
    pub ambush: Option<AmbushId>,
    /// Patrol centre for scouts.
    pub rally_point: Option<Vec3>,
    pub patrol_index: usize,
}

impl Squad {
    fn new(id: SquadId, role: SquadRole, faction: Faction) -> Self {
        Self {
            id,
            role,
            faction,
            members: Vec::new(),
            centroid: Vec3::ZERO,
            heading: Vec3::ZERO,
            average_health: 0.0,
            primary_target: None,
            support_target: None,
            phase: SquadPhase::Advancing,
            cohesion_strength: 1.0,
            move_goal: None,
            ambush: None,
            rally_point: None,
            patrol_index: 0,
        }
    }

    /// No live members: the squad issues nothing until someone joins.
    pub fn is_inert(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Record a squad-level destination and point the heading at it.
    pub fn set_move_goal(&mut self, goal: Vec3) {
        self.move_goal = Some(goal);
        self.update_heading();
    }

    fn update_heading(&mut self) {
        self.heading = self
            .move_goal
            .and_then(|goal| flatten(goal - self.centroid).try_normalize())
            .unwrap_or(Vec3::ZERO);
    }

    /// Drop dead members and recompute the aggregate fields. Returns the pruned units.
    fn refresh(&mut self, units: &UnitRegistry) -> Vec<Entity> {
        let (live, dead): (Vec<Entity>, Vec<Entity>) =
            self.members.iter().partition(|&&m| units.is_alive(m));
        self.members = live;

        let mut sum = Vec3::ZERO;
        let mut health = 0.0;
        for view in self.members.iter().filter_map(|&m| units.get(m)) {
            sum += view.position;
            health += view.health_fraction;
        }
        if self.members.is_empty() {
            self.centroid = Vec3::ZERO;
            self.average_health = 0.0;
        } else {
            let n = self.members.len() as f32;
            self.centroid = sum / n;
            self.average_health = health / n;
        }
        self.update_heading();
        dead
    }
}

/// Owns every squad and the unit → squad index.
#[derive(Debug, Clone)]
pub struct SquadRoster {
    squads: BTreeMap<SquadId, Squad>,
    membership: HashMap<Entity, SquadId>,
    next_id: u32,
    capacity: usize,
}

impl SquadRoster {
    pub fn new(capacity: usize) -> Self {
        Self {
            squads: BTreeMap::new(),
            membership: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn create(&mut self, role: SquadRole, faction: Faction) -> SquadId {
        let id = SquadId(self.next_id);
        self.next_id += 1;
        self.squads.insert(id, Squad::new(id, role, faction));
        log::debug!("created {:?} squad {} for faction {}", role, id, faction.0);
        id
    }

    /// Delete a squad and free its members.
    pub fn remove(&mut self, id: SquadId) -> Option<Squad> {
        let squad = self.squads.remove(&id)?;
        for member in &squad.members {
            self.membership.remove(member);
        }
        Some(squad)
    }

    /// Put `unit` into squad `id`, leaving any previous squad first.
    ///
    /// A full squad rejects the unit without touching any state. Joining queues the
    /// role's behaviour toggles for the unit.
    pub fn assign(
        &mut self,
        unit: Entity,
        id: SquadId,
        intents: &mut IntentBuffer,
    ) -> Result<(), TacticsError> {
        let squad = self.squads.get(&id).ok_or(TacticsError::UnknownSquad(id))?;
        if self.membership.get(&unit) == Some(&id) {
            return Ok(());
        }
        if squad.members.len() >= self.capacity {
            return Err(TacticsError::SquadFull {
                squad: id,
                capacity: self.capacity,
            });
        }
        let role = squad.role;

        self.unassign(unit);
        if let Some(squad) = self.squads.get_mut(&id) {
            squad.members.push(unit);
        }
        self.membership.insert(unit, id);
        for intent in role.configuration() {
            intents.push(unit, intent);
        }
        Ok(())
    }

    /// Remove `unit` from whatever squad holds it.
    pub fn unassign(&mut self, unit: Entity) -> Option<SquadId> {
        let id = self.membership.remove(&unit)?;
        if let Some(squad) = self.squads.get_mut(&id) {
            squad.members.retain(|&m| m != unit);
        }
        Some(id)
    }

    pub fn squad_of(&self, unit: Entity) -> Option<SquadId> {
        self.membership.get(&unit).copied()
    }

    pub fn get(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    pub fn get_mut(&mut self, id: SquadId) -> Option<&mut Squad> {
        self.squads.get_mut(&id)
    }

    pub fn contains(&self, id: SquadId) -> bool {
        self.squads.contains_key(&id)
    }

    /// Squads in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Squad> + '_ {
        self.squads.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Squad> + '_ {
        self.squads.values_mut()
    }

    pub fn ids(&self) -> Vec<SquadId> {
        self.squads.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.squads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squads.is_empty()
    }

    /// Prune dead members everywhere and recompute centroids, health and headings.
    pub fn refresh(&mut self, units: &UnitRegistry) {
        for squad in self.squads.values_mut() {
            for dead in squad.refresh(units) {
                self.membership.remove(&dead);
                log::trace!("pruned dead unit {:?} from squad {}", dead, squad.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{set_health, spawn_unit};
    use engine_core::{UnitKind, World};

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut roster = SquadRoster::new(8);
        let a = roster.create(SquadRole::Assault, Faction(0));
        let b = roster.create(SquadRole::Support, Faction(0));
        roster.remove(b);
        let c = roster.create(SquadRole::Scout, Faction(0));
        assert!(a < b && b < c);
        assert_eq!(roster.ids(), vec![a, c]);
    }

    #[test]
    fn assignment_moves_unit_between_squads() {
        let mut world = World::new();
        let unit = spawn_unit(&mut world, Vec3::ZERO, 0, UnitKind::Infantry);
        let mut roster = SquadRoster::new(8);
        let mut intents = IntentBuffer::new();
        let a = roster.create(SquadRole::Assault, Faction(0));
        let b = roster.create(SquadRole::Flanker, Faction(0));

        roster.assign(unit, a, &mut intents).expect("assign a");
        roster.assign(unit, b, &mut intents).expect("assign b");
        assert_eq!(roster.squad_of(unit), Some(b));
        assert!(roster.get(a).map_or(false, |s| s.members.is_empty()));
        assert_eq!(roster.get(b).map(|s| s.members.clone()), Some(vec![unit]));
        // Flanker configuration arrives last.
        let last: Vec<_> = intents.for_unit(unit).copied().collect();
        assert_eq!(
            &last[2..],
            &[UnitIntent::SetAggressive(true), UnitIntent::EnableFlanking(true)]
        );
    }

    #[test]
    fn full_squad_rejects_without_side_effects() {
        let mut world = World::new();
        let mut roster = SquadRoster::new(2);
        let mut intents = IntentBuffer::new();
        let home = roster.create(SquadRole::Assault, Faction(0));
        let full = roster.create(SquadRole::Support, Faction(0));
        for _ in 0..2 {
            let u = spawn_unit(&mut world, Vec3::ZERO, 0, UnitKind::Infantry);
            roster.assign(u, full, &mut intents).expect("fill");
        }
        let unit = spawn_unit(&mut world, Vec3::ZERO, 0, UnitKind::Infantry);
        roster.assign(unit, home, &mut intents).expect("home");
        let before = intents.len();

        let err = roster.assign(unit, full, &mut intents).unwrap_err();
        assert_eq!(err, TacticsError::SquadFull { squad: full, capacity: 2 });
        assert_eq!(roster.squad_of(unit), Some(home));
        assert_eq!(roster.get(full).map(|s| s.len()), Some(2));
        assert_eq!(intents.len(), before);
    }

    #[test]
    fn unknown_squad_is_an_error() {
        let mut world = World::new();
        let unit = spawn_unit(&mut world, Vec3::ZERO, 0, UnitKind::Infantry);
        let mut roster = SquadRoster::new(8);
        let err = roster.assign(unit, SquadId(42), &mut IntentBuffer::new()).unwrap_err();
        assert_eq!(err, TacticsError::UnknownSquad(SquadId(42)));
    }

    #[test]
    fn refresh_prunes_dead_and_averages_live() {
        let mut world = World::new();
        let mut roster = SquadRoster::new(8);
        let mut intents = IntentBuffer::new();
        let id = roster.create(SquadRole::Assault, Faction(0));
        let a = spawn_unit(&mut world, Vec3::new(0.0, 0.0, 0.0), 0, UnitKind::Infantry);
        let b = spawn_unit(&mut world, Vec3::new(4.0, 0.0, 0.0), 0, UnitKind::Infantry);
        let c = spawn_unit(&mut world, Vec3::new(100.0, 0.0, 0.0), 0, UnitKind::Infantry);
        for u in [a, b, c] {
            roster.assign(u, id, &mut intents).expect("assign");
        }
        set_health(&mut world, b, 50.0);
        set_health(&mut world, c, 0.0);

        roster.refresh(&UnitRegistry::snapshot(&world));
        let squad = roster.get(id).expect("squad");
        assert_eq!(squad.members, vec![a, b]);
        assert_eq!(squad.centroid, Vec3::new(2.0, 0.0, 0.0));
        assert!((squad.average_health - 0.75).abs() < 1e-6);
        assert_eq!(roster.squad_of(c), None);
    }

    #[test]
    fn sole_survivor_becomes_the_centroid() {
        let mut world = World::new();
        let mut roster = SquadRoster::new(8);
        let mut intents = IntentBuffer::new();
        let id = roster.create(SquadRole::Flanker, Faction(0));
        let units: Vec<Entity> = [-30.0, 5.0, 60.0, 90.0]
            .into_iter()
            .map(|x| spawn_unit(&mut world, Vec3::new(x, 0.0, 12.0), 0, UnitKind::Infantry))
            .collect();
        for &u in &units {
            roster.assign(u, id, &mut intents).expect("assign");
        }
        roster.refresh(&UnitRegistry::snapshot(&world));

        let survivor = units[2];
        set_health(&mut world, survivor, 30.0);
        for &u in units.iter().filter(|&&u| u != survivor) {
            set_health(&mut world, u, 0.0);
        }
        roster.refresh(&UnitRegistry::snapshot(&world));

        let squad = roster.get(id).expect("squad");
        assert_eq!(squad.members, vec![survivor]);
        assert_eq!(squad.centroid, Vec3::new(60.0, 0.0, 12.0));
        assert!((squad.average_health - 0.3).abs() < 1e-6);
        assert!(!squad.is_inert());
    }

    #[test]
    fn all_dead_squad_is_inert_with_zero_centroid() {
        let mut world = World::new();
        let mut roster = SquadRoster::new(8);
        let id = roster.create(SquadRole::Assault, Faction(0));
        let a = spawn_unit(&mut world, Vec3::new(7.0, 0.0, 7.0), 0, UnitKind::Infantry);
        roster.assign(a, id, &mut IntentBuffer::new()).expect("assign");
        world.despawn(a).expect("despawn");

        roster.refresh(&UnitRegistry::snapshot(&world));
        let squad = roster.get(id).expect("squad survives");
        assert!(squad.is_inert());
        assert_eq!(squad.centroid, Vec3::ZERO);
    }

    #[test]
    fn heading_follows_move_goal() {
        let mut squad = Squad::new(SquadId(1), SquadRole::Assault, Faction(0));
        assert_eq!(squad.heading, Vec3::ZERO);
        squad.set_move_goal(Vec3::new(10.0, 3.0, 0.0));
        assert_eq!(squad.heading, Vec3::X);
    }
}
