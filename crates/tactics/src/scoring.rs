//! Position scoring against a tactical posture.
//!
//! Candidates are laid out on concentric rings around a centre. Each one is scored from
//! its terrain cell, a posture-specific bonus and the surrounding threat; the best
//! candidate wins. Cells that are not sampled yet score [`f32::MIN`] and never win, so a
//! search made before the terrain is known keeps the current position.

use std::f32::consts::TAU;

use engine_core::{planar_distance, Entity, Faction, Vec3};

use crate::config::ScoringConfig;
use crate::registry::UnitRegistry;
use crate::terrain::TerrainCache;
use crate::threat::ThreatAssessor;

/// Posture a position is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TacticalBehavior {
    /// Seeks high ground and open movement.
    #[default]
    Aggressive,
    /// Prioritises cover, then height.
    Defensive,
    /// Prioritises movement speed; avoids impassable ground at all cost.
    Mobile,
    /// Stays near friendlies, in cover where possible.
    Support,
}

/// Everything a score needs besides the position itself.
pub struct ScoringContext<'a> {
    pub terrain: &'a mut TerrainCache,
    pub units: &'a UnitRegistry,
    pub threat: &'a ThreatAssessor,
    /// Side whose hostiles count as threats and whose units count as support.
    pub faction: Faction,
    /// Unit being positioned; excluded from its own support bonus.
    pub subject: Option<Entity>,
    pub now: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: Vec3,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct PositionScorer {
    config: ScoringConfig,
}

impl PositionScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Ring candidates around `center`, innermost ring first.
    pub fn candidates(&self, center: Vec3) -> Vec<Vec3> {
        let mut positions = Vec::new();
        for ring in 1..=self.config.ring_count {
            let radius = ring as f32 * self.config.ring_step;
            let points = (8 * ring).max(8);
            for i in 0..points {
                let angle = i as f32 * TAU / points as f32;
                positions.push(center + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius));
            }
        }
        positions
    }

    /// Score `position` for `behavior`. Unsampled terrain scores [`f32::MIN`].
    pub fn score(&self, ctx: &mut ScoringContext<'_>, position: Vec3, behavior: TacticalBehavior) -> f32 {
        let Some(cell) = ctx.terrain.analyze(position, ctx.now).cell() else {
            return f32::MIN;
        };
        let c = &self.config;
        let mobility = cell.effective_mobility();
        let high_ground = cell.is_high_ground;
        let cover = cell.provides_cover;
        let impassable = cell.is_impassable;

        let mut score = mobility * c.mobility_weight;
        if high_ground {
            score += c.height_advantage_weight;
        }
        if cover {
            score += c.cover_weight;
        }

        match behavior {
            TacticalBehavior::Aggressive => {
                if high_ground {
                    score += c.height_advantage_weight * 2.0;
                }
                score += mobility * c.mobility_weight * 1.5;
            }
            TacticalBehavior::Defensive => {
                if cover {
                    score += c.cover_weight * 2.0;
                }
                if high_ground {
                    score += c.height_advantage_weight * 1.5;
                }
            }
            TacticalBehavior::Mobile => {
                score += mobility * c.mobility_weight * 2.0;
                if impassable {
                    score -= c.impassable_penalty;
                }
            }
            TacticalBehavior::Support => {
                if cover {
                    score += c.cover_weight * 1.5;
                }
                score += self.support_bonus(ctx, position);
            }
        }

        score - ctx.threat.level(ctx.units, ctx.faction, position) * c.threat_avoidance_weight
    }

    /// Best ring candidate around `current`; `current` itself when nothing is scoreable.
    pub fn find_optimal_position(
        &self,
        ctx: &mut ScoringContext<'_>,
        current: Vec3,
        behavior: TacticalBehavior,
    ) -> ScoredPosition {
        let mut best = ScoredPosition {
            position: current,
            score: f32::MIN,
        };
        for candidate in self.candidates(current) {
            let score = self.score(ctx, candidate, behavior);
            if score > best.score {
                best = ScoredPosition {
                    position: candidate,
                    score,
                };
            }
        }
        best
    }

    fn support_bonus(&self, ctx: &ScoringContext<'_>, position: Vec3) -> f32 {
        let radius = self.config.support_radius;
        if radius <= 0.0 {
            return 0.0;
        }
        ctx.units
            .friendlies_of(ctx.faction)
            .filter(|u| Some(u.entity) != ctx.subject)
            .map(|u| planar_distance(u.position, position))
            .filter(|&d| d < radius)
            .map(|d| 1.0 - d / radius)
            .sum()
    }
}
