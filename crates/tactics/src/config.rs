//! Tactical tuning. Loaded from a RON file; every missing field falls back to its default.

use std::path::Path;

use engine_core::UnitKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// All tunables of the tactical layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticsConfig {
    /// Seconds of game time between tactical ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f32,
    #[serde(default)]
    pub terrain: TerrainAnalysisConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub threat: ThreatConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub squads: SquadConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
}

fn default_tick_interval() -> f32 {
    0.5
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            terrain: TerrainAnalysisConfig::default(),
            scoring: ScoringConfig::default(),
            threat: ThreatConfig::default(),
            analyzer: AnalyzerConfig::default(),
            squads: SquadConfig::default(),
            coordination: CoordinationConfig::default(),
        }
    }
}

impl TacticsConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(data)?)
    }

    /// Read and parse a config file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&data)
    }

    /// Load config from `path`. If the file is missing or invalid, returns default config.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(config) => config,
            Err(ConfigError::Io { .. }) => {
                log::info!("No tactics config at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                log::warn!("Invalid tactics config at {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }
}

/// Terrain sampling and classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainAnalysisConfig {
    /// Edge length of one analysed cell in world units.
    pub analysis_grid_size: f32,
    /// Spacing of height probes inside a cell.
    pub height_sample_spacing: f32,
    /// Probes start this high and reach twice as far down.
    pub max_analysis_height: f32,
    /// Probes issued per batch; the backpressure bound on the world query subsystem.
    pub max_concurrent_raycasts: usize,
    /// Batches the cache may run per tick across all queued cells.
    pub max_probe_batches_per_tick: usize,
    /// Age in seconds after which a cell is refreshed.
    pub staleness_seconds: f32,
    /// LRU bound on cached cells.
    pub max_cached_cells: usize,
    /// Average slope (degrees) above which a cell is impassable.
    pub max_traversable_slope: f32,
    /// Height spread inside a cell that marks high ground.
    pub high_ground_threshold: f32,
    /// Minimum obstacle height that counts as cover.
    pub cover_height: f32,
    pub water_level: f32,
    pub mud_slowdown_factor: f32,
}

impl Default for TerrainAnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_grid_size: 5.0,
            height_sample_spacing: 1.0,
            max_analysis_height: 100.0,
            max_concurrent_raycasts: 100,
            max_probe_batches_per_tick: 32,
            staleness_seconds: 1.0,
            max_cached_cells: 4096,
            max_traversable_slope: 35.0,
            high_ground_threshold: 3.0,
            cover_height: 1.5,
            water_level: 0.0,
            mud_slowdown_factor: 0.5,
        }
    }
}

/// Position scoring weights and candidate layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub ring_count: u32,
    pub ring_step: f32,
    pub height_advantage_weight: f32,
    pub cover_weight: f32,
    pub mobility_weight: f32,
    pub threat_avoidance_weight: f32,
    /// Subtracted from impassable cells under the Mobile posture.
    pub impassable_penalty: f32,
    /// Friendlies inside this radius add a linearly decaying support bonus.
    pub support_radius: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ring_count: 5,
            ring_step: 5.0,
            height_advantage_weight: 1.5,
            cover_weight: 1.2,
            mobility_weight: 1.0,
            threat_avoidance_weight: 2.0,
            impassable_penalty: 1000.0,
            support_radius: 10.0,
        }
    }
}

/// Per-kind threat multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KindWeights {
    pub infantry: f32,
    pub ranged: f32,
    pub armor: f32,
    pub artillery: f32,
    pub bunker: f32,
    pub air: f32,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            infantry: 1.0,
            ranged: 1.3,
            armor: 1.2,
            artillery: 1.5,
            bunker: 1.0,
            air: 1.2,
        }
    }
}

impl KindWeights {
    pub fn weight(&self, kind: UnitKind) -> f32 {
        match kind {
            UnitKind::Infantry => self.infantry,
            UnitKind::Ranged => self.ranged,
            UnitKind::Armor => self.armor,
            UnitKind::Artillery => self.artillery,
            UnitKind::Bunker => self.bunker,
            UnitKind::Air => self.air,
        }
    }
}

/// Threat assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Hostiles farther than this never contribute.
    pub engagement_radius: f32,
    /// Multiplier applied to a hostile's contribution when cover sits between.
    pub cover_discount: f32,
    /// Minimum cosine between the hostile and cover directions for cover to count.
    pub cover_alignment: f32,
    /// Hostiles inside a unit's attack range that count as a heavy attack.
    pub heavy_attack_count: usize,
    pub kind_weights: KindWeights,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            engagement_radius: 100.0,
            cover_discount: 0.5,
            cover_alignment: 0.7,
            heavy_attack_count: 3,
            kind_weights: KindWeights::default(),
        }
    }
}

/// Per-unit tactical analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Minimum seconds between two analyses of the same unit.
    pub unit_update_interval: f32,
    pub max_unit_analyses_per_tick: usize,
    /// A unit is only sent to its optimal position when farther than this.
    pub reposition_threshold: f32,
    pub max_cover_candidates: usize,
    /// Health fraction below which a unit turns defensive.
    pub defensive_health: f32,
    /// Health fraction below which a unit falls back to support.
    pub support_health: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            unit_update_interval: 1.0,
            max_unit_analyses_per_tick: 10,
            reposition_threshold: 1.0,
            max_cover_candidates: 5,
            defensive_health: 0.3,
            support_health: 0.6,
        }
    }
}

/// Squad state machines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    pub max_squad_size: usize,
    pub cohesion_radius: f32,
    pub assault_range: f32,
    /// Distance of a flank anchor from the target.
    pub flanker_spread_distance: f32,
    /// Lateral spacing between flankers on their line.
    pub flanker_line_spacing: f32,
    /// Distance a support squad keeps behind the squad it supports.
    pub support_standoff: f32,
    pub target_detection_radius: f32,
    /// Average health below which combat squads fall back. `None` disables retreating.
    pub retreat_health_threshold: Option<f32>,
    pub retreat_distance: f32,
    pub scout_patrol_radius: f32,
    pub scout_waypoints: usize,
    pub scout_arrival_radius: f32,
    pub scout_detection_radius: f32,
    /// Seconds a scout contact report stays usable for targeting.
    pub contact_ttl: f32,
}

impl Default for SquadConfig {
    fn default() -> Self {
        Self {
            max_squad_size: 8,
            cohesion_radius: 15.0,
            assault_range: 25.0,
            flanker_spread_distance: 12.0,
            flanker_line_spacing: 4.0,
            support_standoff: 10.0,
            target_detection_radius: 60.0,
            retreat_health_threshold: None,
            retreat_distance: 30.0,
            scout_patrol_radius: 40.0,
            scout_waypoints: 6,
            scout_arrival_radius: 4.0,
            scout_detection_radius: 45.0,
            contact_ttl: 5.0,
        }
    }
}

/// Cross-squad coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// A support squad only switches to a new assault squad that is closer by more than
    /// this. `None` reassigns to the nearest every tick.
    pub support_reassign_hysteresis: Option<f32>,
    pub ambush_trigger_radius: f32,
    pub ambush_recruit_radius: f32,
    pub ambush_ring_radius: f32,
    pub shield_radius: f32,
    pub resupply_radius: f32,
    /// Ammo points per second.
    pub resupply_rate: f32,
    pub max_ammo: f32,
    pub shield_damage_reduction: f32,
    pub bunker_threat_radius: f32,
    pub fortify_threshold: f32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            support_reassign_hysteresis: Some(5.0),
            ambush_trigger_radius: 20.0,
            ambush_recruit_radius: 50.0,
            ambush_ring_radius: 15.0,
            shield_radius: 20.0,
            resupply_radius: 15.0,
            resupply_rate: 10.0,
            max_ammo: 100.0,
            shield_damage_reduction: 0.3,
            bunker_threat_radius: 35.0,
            fortify_threshold: 3.0,
        }
    }
}
