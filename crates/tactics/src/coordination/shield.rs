//! Bunker / artillery pairing: bunkers shield and resupply nearby artillery of their side,
//! fortify under pressure and call out the most dangerous hostile.

use std::collections::{HashMap, HashSet};

use engine_core::{planar_distance, Entity, Faction, UnitKind};

use crate::config::CoordinationConfig;
use crate::director::TacticalEvent;
use crate::intent::{IntentBuffer, UnitIntent};
use crate::registry::UnitRegistry;
use crate::threat::ThreatAssessor;

/// Damage reduction source key for the bunker shield.
pub const SHIELD_SOURCE: &str = "bunker_shield";

#[derive(Debug, Clone, PartialEq)]
pub struct ShieldPairing {
    pub bunker: Entity,
    pub artillery: Vec<Entity>,
    pub fortified: bool,
    pub priority_target: Option<Entity>,
}

impl ShieldPairing {
    fn new(bunker: Entity) -> Self {
        Self {
            bunker,
            artillery: Vec::new(),
            fortified: false,
            priority_target: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShieldNetwork {
    config: CoordinationConfig,
    /// One entry per live bunker, in entity order.
    pairings: Vec<ShieldPairing>,
    ammo: HashMap<Entity, f32>,
    shielded: HashSet<Entity>,
}

impl ShieldNetwork {
    pub fn new(config: CoordinationConfig) -> Self {
        Self {
            config,
            pairings: Vec::new(),
            ammo: HashMap::new(),
            shielded: HashSet::new(),
        }
    }

    pub fn pairings(&self) -> &[ShieldPairing] {
        &self.pairings
    }

    pub fn pairing(&self, bunker: Entity) -> Option<&ShieldPairing> {
        self.pairings.iter().find(|p| p.bunker == bunker)
    }

    /// Remaining ammo of an artillery unit; full if it never fired.
    pub fn ammo(&self, artillery: Entity) -> f32 {
        self.ammo.get(&artillery).copied().unwrap_or(self.config.max_ammo)
    }

    pub fn report_ammo_spent(&mut self, artillery: Entity, amount: f32) {
        let max = self.config.max_ammo;
        let ammo = self.ammo.entry(artillery).or_insert(max);
        *ammo = (*ammo - amount).clamp(0.0, max);
    }

    pub fn update(
        &mut self,
        units: &UnitRegistry,
        managed: &[Faction],
        threat: &ThreatAssessor,
        intents: &mut IntentBuffer,
        events: &mut Vec<TacticalEvent>,
        dt: f32,
    ) {
        self.forget_dead(units);
        self.claim_artillery(units, managed);

        let c = &self.config;
        for pairing in &mut self.pairings {
            let Some(bunker) = units.get(pairing.bunker) else {
                continue;
            };

            let pressure = threat.area_threat(units, bunker.faction, bunker.position, c.bunker_threat_radius);
            if pressure >= c.fortify_threshold {
                if !pairing.fortified {
                    pairing.fortified = true;
                    log::debug!("bunker {:?} fortifies (threat {:.1})", pairing.bunker, pressure);
                    intents.push(pairing.bunker, UnitIntent::Fortify);
                    events.push(TacticalEvent::BunkerFortified {
                        bunker: pairing.bunker,
                    });
                }
            } else {
                pairing.fortified = false;
            }

            let nearby = threat.hostiles_within(units, bunker.faction, bunker.position, c.bunker_threat_radius);
            let target = threat.priority_target(nearby, bunker.position);
            let target_id = target.map(|t| t.entity);
            if target_id != pairing.priority_target {
                pairing.priority_target = target_id;
                if let Some(target) = target {
                    intents.push(
                        pairing.bunker,
                        UnitIntent::PriorityTarget {
                            target: target.entity,
                            airborne: target.profile.airborne,
                        },
                    );
                }
            }

            for &artillery in &pairing.artillery {
                let Some(gun) = units.get(artillery) else {
                    continue;
                };
                let distance = planar_distance(bunker.position, gun.position);
                if distance <= c.resupply_radius {
                    let ammo = self.ammo.entry(artillery).or_insert(c.max_ammo);
                    *ammo = (*ammo + c.resupply_rate * dt).min(c.max_ammo);
                }
                if distance <= c.shield_radius && self.shielded.insert(artillery) {
                    intents.push(
                        artillery,
                        UnitIntent::DamageReduction {
                            source: SHIELD_SOURCE,
                            amount: c.shield_damage_reduction,
                        },
                    );
                }
            }
        }

        // Artillery that lost its bunker's cover.
        let covered: HashSet<Entity> = self
            .pairings
            .iter()
            .flat_map(|p| p.artillery.iter().copied())
            .collect();
        let exposed: Vec<Entity> = self
            .shielded
            .iter()
            .copied()
            .filter(|a| !covered.contains(a))
            .collect();
        for artillery in exposed {
            self.shielded.remove(&artillery);
            if units.is_alive(artillery) {
                intents.push(
                    artillery,
                    UnitIntent::DamageReduction {
                        source: SHIELD_SOURCE,
                        amount: 0.0,
                    },
                );
            }
        }
    }

    fn forget_dead(&mut self, units: &UnitRegistry) {
        self.pairings.retain(|p| units.is_alive(p.bunker));
        for pairing in &mut self.pairings {
            pairing.artillery.retain(|&a| units.is_alive(a));
        }
        self.ammo.retain(|&a, _| units.is_alive(a));
    }

    /// Keep artillery still inside the shield and let bunkers claim unclaimed guns nearby.
    fn claim_artillery(&mut self, units: &UnitRegistry, managed: &[Faction]) {
        let radius = self.config.shield_radius;
        for bunker in units
            .iter()
            .filter(|u| u.profile.kind == UnitKind::Bunker && managed.contains(&u.faction))
        {
            if self.pairing(bunker.entity).is_none() {
                self.pairings.push(ShieldPairing::new(bunker.entity));
            }
        }
        self.pairings.sort_by_key(|p| p.bunker.to_bits());

        for pairing in &mut self.pairings {
            if let Some(bunker) = units.get(pairing.bunker) {
                pairing.artillery.retain(|&a| {
                    units
                        .get(a)
                        .is_some_and(|gun| planar_distance(gun.position, bunker.position) <= radius)
                });
            }
        }

        let mut claimed: HashSet<Entity> = self
            .pairings
            .iter()
            .flat_map(|p| p.artillery.iter().copied())
            .collect();
        for pairing in &mut self.pairings {
            let Some(bunker) = units.get(pairing.bunker) else {
                continue;
            };
            for gun in units.friendlies_of(bunker.faction) {
                if gun.profile.kind == UnitKind::Artillery
                    && !claimed.contains(&gun.entity)
                    && planar_distance(gun.position, bunker.position) <= radius
                {
                    claimed.insert(gun.entity);
                    pairing.artillery.push(gun.entity);
                }
            }
        }
    }
}
