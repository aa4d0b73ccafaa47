//! Hostile pressure at a point, for a squad, or from one unit.

use engine_core::{flatten, planar_distance, Faction, Vec3};

use crate::config::ThreatConfig;
use crate::registry::{UnitRegistry, UnitView};
use crate::squad::Squad;
use crate::terrain::TerrainCache;

/// Distance scale of the individual threat falloff.
const THREAT_FALLOFF: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct ThreatAssessor {
    config: ThreatConfig,
}

impl ThreatAssessor {
    pub fn new(config: ThreatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThreatConfig {
        &self.config
    }

    /// Sum of `1 - d / attack_range` over hostiles in range of `position`.
    pub fn level(&self, units: &UnitRegistry, faction: Faction, position: Vec3) -> f32 {
        units
            .hostiles_near(faction, position, self.config.engagement_radius)
            .map(|hostile| proximity(hostile, position))
            .sum()
    }

    /// [`Self::level`] scaled per unit kind and discounted by cover at `position`.
    pub fn weighted_level(
        &self,
        units: &UnitRegistry,
        terrain: &TerrainCache,
        faction: Faction,
        position: Vec3,
    ) -> f32 {
        let cover = terrain
            .peek(position)
            .map(|cell| cell.cover_points.as_slice())
            .unwrap_or_default();

        units
            .hostiles_near(faction, position, self.config.engagement_radius)
            .map(|hostile| {
                let mut term = proximity(hostile, position)
                    * self.config.kind_weights.weight(hostile.profile.kind);
                if term > 0.0 && self.covered_from(position, hostile.position, cover) {
                    term *= self.config.cover_discount;
                }
                term
            })
            .sum()
    }

    /// Weighted threat at a squad's centroid. Inert squads feel nothing.
    pub fn squad_threat(&self, units: &UnitRegistry, terrain: &TerrainCache, squad: &Squad) -> f32 {
        if squad.is_inert() {
            return 0.0;
        }
        self.weighted_level(units, terrain, squad.faction, squad.centroid)
    }

    /// How dangerous one hostile is to something standing at `from`.
    pub fn individual_threat(&self, unit: &UnitView, from: Vec3) -> f32 {
        let distance = planar_distance(unit.position, from);
        unit.profile.attack_damage
            * unit.health_fraction
            * self.config.kind_weights.weight(unit.profile.kind)
            / (distance * THREAT_FALLOFF).max(1.0)
    }

    /// Undiscounted firepower of all hostiles within `radius` of `center`.
    pub fn area_threat(
        &self,
        units: &UnitRegistry,
        faction: Faction,
        center: Vec3,
        radius: f32,
    ) -> f32 {
        units
            .hostiles_near(faction, center, radius)
            .map(|u| {
                u.profile.attack_damage
                    * u.health_fraction
                    * self.config.kind_weights.weight(u.profile.kind)
            })
            .sum()
    }

    pub fn hostiles_within<'a>(
        &self,
        units: &'a UnitRegistry,
        faction: Faction,
        center: Vec3,
        radius: f32,
    ) -> Vec<&'a UnitView> {
        units.hostiles_near(faction, center, radius).collect()
    }

    /// Enough hostiles inside the unit's own attack range.
    pub fn is_under_heavy_attack(&self, units: &UnitRegistry, unit: &UnitView) -> bool {
        units
            .hostiles_near(unit.faction, unit.position, unit.profile.attack_range)
            .count()
            >= self.config.heavy_attack_count
    }

    /// The most threatening candidate as seen from `from`. Ties go to the lowest entity id.
    pub fn priority_target<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a UnitView>,
        from: Vec3,
    ) -> Option<&'a UnitView> {
        let mut best: Option<(&UnitView, f32)> = None;
        for candidate in candidates {
            let score = self.individual_threat(candidate, from);
            let better = match best {
                None => true,
                Some((current, current_score)) => {
                    score > current_score
                        || (score == current_score
                            && candidate.entity.to_bits() < current.entity.to_bits())
                }
            };
            if better {
                best = Some((candidate, score));
            }
        }
        best.map(|(unit, _)| unit)
    }

    fn covered_from(&self, position: Vec3, hostile: Vec3, cover: &[Vec3]) -> bool {
        let to_hostile = flatten(hostile - position);
        let hostile_distance = to_hostile.length();
        let Some(to_hostile) = to_hostile.try_normalize() else {
            return false;
        };
        cover.iter().any(|&point| {
            let to_cover = flatten(point - position);
            let cover_distance = to_cover.length();
            to_cover.try_normalize().is_some_and(|dir| {
                dir.dot(to_hostile) > self.config.cover_alignment
                    && cover_distance < hostile_distance
            })
        })
    }
}

fn proximity(hostile: &UnitView, position: Vec3) -> f32 {
    let range = hostile.profile.attack_range;
    if range <= 0.0 {
        return 0.0;
    }
    (1.0 - planar_distance(hostile.position, position) / range).max(0.0)
}
