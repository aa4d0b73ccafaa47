//! Skirmish settings. Loaded from `sandbox.ron` at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tactics::TacticsConfig;

/// Battlefield, forces and run length of a headless skirmish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// World seed; terrain, cover and spawn jitter all derive from it.
    #[serde(default)]
    pub seed: u64,
    /// Edge length of the square map in world units.
    #[serde(default = "default_map_size")]
    pub map_size: f32,
    /// Heightmap vertices per side.
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    #[serde(default = "default_height_scale")]
    pub height_scale: f32,
    #[serde(default = "default_cover_count")]
    pub cover_count: usize,
    /// Units per squad; every side fields one squad per role.
    #[serde(default = "default_squad_size")]
    pub squad_size: usize,
    /// Distance of each side's spawn from the map centre.
    #[serde(default = "default_spawn_offset")]
    pub spawn_offset: f32,
    /// Simulated game time in seconds.
    #[serde(default = "default_duration")]
    pub duration: f32,
    /// Movement loop step in seconds.
    #[serde(default = "default_frame_dt")]
    pub frame_dt: f32,
    /// Unit speed in world units per second.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default)]
    pub tactics: TacticsConfig,
}

fn default_map_size() -> f32 {
    256.0
}
fn default_resolution() -> u32 {
    129
}
fn default_height_scale() -> f32 {
    20.0
}
fn default_cover_count() -> usize {
    120
}
fn default_squad_size() -> usize {
    4
}
fn default_spawn_offset() -> f32 {
    70.0
}
fn default_duration() -> f32 {
    120.0
}
fn default_frame_dt() -> f32 {
    1.0 / 30.0
}
fn default_move_speed() -> f32 {
    4.0
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            map_size: default_map_size(),
            resolution: default_resolution(),
            height_scale: default_height_scale(),
            cover_count: default_cover_count(),
            squad_size: default_squad_size(),
            spawn_offset: default_spawn_offset(),
            duration: default_duration(),
            frame_dt: default_frame_dt(),
            move_speed: default_move_speed(),
            tactics: TacticsConfig::default(),
        }
    }
}

impl SandboxConfig {
    /// Load config from `path`. If the file is missing or invalid, returns default config.
    pub fn load(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        } else {
            log::info!("No sandbox config at {:?}, using defaults", path);
        }
        Self::default()
    }
}

/// First CLI argument, or `sandbox.ron` in the current directory.
pub fn config_path() -> PathBuf {
    std::env::args_os().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("sandbox.ron")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tactics_section_overrides_only_named_fields() {
        let config: SandboxConfig =
            ron::from_str("(seed: 7, tactics: (tick_interval: 0.25, squads: (assault_range: 30.0)))")
                .expect("parse");
        assert_eq!(config.seed, 7);
        assert_eq!(config.squad_size, 4);
        assert_eq!(config.tactics.tick_interval, 0.25);
        assert_eq!(config.tactics.squads.assault_range, 30.0);
        assert_eq!(config.tactics.squads.max_squad_size, 8);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = SandboxConfig::load(Path::new("/nonexistent/sandbox.ron"));
        assert_eq!(config.map_size, 256.0);
    }
}
