//! Scout patrol routes and the shared contact board.

use std::collections::HashMap;
use std::f32::consts::TAU;

use engine_core::{Entity, Faction, Vec3};

/// A cyclic patrol around a rally point.
pub trait ReconRoute {
    /// Number of waypoints in one lap.
    fn waypoint_count(&self) -> usize;

    /// Waypoint `index` (taken modulo the lap length) around `rally`.
    fn waypoint(&self, rally: Vec3, index: usize) -> Vec3;
}

/// Evenly spaced waypoints on a circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatrolRing {
    pub radius: f32,
    pub waypoints: usize,
}

impl PatrolRing {
    pub fn new(radius: f32, waypoints: usize) -> Self {
        Self { radius, waypoints }
    }
}

impl ReconRoute for PatrolRing {
    fn waypoint_count(&self) -> usize {
        self.waypoints
    }

    fn waypoint(&self, rally: Vec3, index: usize) -> Vec3 {
        if self.waypoints == 0 {
            return rally;
        }
        let angle = (index % self.waypoints) as f32 * TAU / self.waypoints as f32;
        rally + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius
    }
}

/// Last known whereabouts of a hostile unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub unit: Entity,
    pub position: Vec3,
    pub reported_at: f32,
}

/// Sightings shared by every squad of the reporting faction. Entries expire after `ttl`.
#[derive(Debug, Clone)]
pub struct ContactBoard {
    ttl: f32,
    contacts: HashMap<(Faction, Entity), Contact>,
}

impl ContactBoard {
    pub fn new(ttl: f32) -> Self {
        Self {
            ttl,
            contacts: HashMap::new(),
        }
    }

    /// Record a sighting. Returns `true` when the contact was not already on the board.
    pub fn report(&mut self, observer: Faction, unit: Entity, position: Vec3, now: f32) -> bool {
        let fresh = !self
            .contacts
            .get(&(observer, unit))
            .is_some_and(|c| now - c.reported_at < self.ttl);
        self.contacts.insert(
            (observer, unit),
            Contact {
                unit,
                position,
                reported_at: now,
            },
        );
        fresh
    }

    /// Contacts known to `observer` that have not expired, oldest entity first.
    pub fn known_to(&self, observer: Faction, now: f32) -> Vec<Contact> {
        let mut known: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|((faction, _), c)| *faction == observer && now - c.reported_at < self.ttl)
            .map(|(_, c)| *c)
            .collect();
        known.sort_by_key(|c| c.unit.to_bits());
        known
    }

    /// Forget expired contacts.
    pub fn expire(&mut self, now: f32) {
        let ttl = self.ttl;
        self.contacts.retain(|_, c| now - c.reported_at < ttl);
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
