//! Headless skirmish: two AI-driven forces on a procedural battlefield.
//!
//! Usage: `skirmish [config.ron]` (defaults to `sandbox.ron` in the current directory).

mod battlefield;
mod config;
mod executor;

use anyhow::{Context, Result};
use engine_core::{Faction, Health, Vec3, World};
use tactics::{SquadId, TacticalDirector, TacticalEvent};

use battlefield::{spawn_force, spawn_rng, Battlefield};
use config::{config_path, SandboxConfig};
use executor::Executor;

const BLUE: Faction = Faction(0);
const RED: Faction = Faction(1);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = config_path();
    let config = SandboxConfig::load(&path);
    log::info!("skirmish seed {} for {:.0}s", config.seed, config.duration);

    let field = Battlefield::generate(&config);
    let mut units = World::new();
    let mut director = TacticalDirector::new(config.tactics.clone(), BLUE);
    let mut rng = spawn_rng(config.seed);

    let blue = spawn_force(
        &mut units,
        &mut director,
        &field,
        BLUE,
        Vec3::new(-config.spawn_offset, 0.0, 0.0),
        config.squad_size,
        &mut rng,
    )
    .context("spawning blue force")?;
    let red = spawn_force(
        &mut units,
        &mut director,
        &field,
        RED,
        Vec3::new(config.spawn_offset, 0.0, 0.0),
        config.squad_size,
        &mut rng,
    )
    .context("spawning red force")?;

    // Blue's scouts lie in wait in the middle of the map.
    if let Some(&scouts) = blue.get(3) {
        director
            .initiate_ambush(scouts, Vec3::ZERO)
            .context("setting blue ambush")?;
    }

    let mut executor = Executor::new(config.move_speed);
    let frame_dt = config.frame_dt.max(1e-3);
    let frames = (config.duration / frame_dt).ceil() as u64;
    let mut ticks = 0u64;
    let mut orders = 0usize;

    for _ in 0..frames {
        if let Some(report) = director.advance(frame_dt, &units, &field.physics) {
            ticks += 1;
            orders += report.orders.len();
            for event in &report.events {
                log_event(event);
            }
            report.dispatch(&mut executor);
        }
        executor.step_movement(&mut units, &field, frame_dt);
        executor.step_combat(&mut units, frame_dt);
        executor.prune(&units);

        if survivors(&units, BLUE) == 0 || survivors(&units, RED) == 0 {
            break;
        }
    }

    log::info!(
        "{} ticks over {:.1}s, {} orders, {} terrain cells cached",
        ticks,
        director.elapsed(),
        orders,
        director.terrain().len()
    );
    summarize(&director, &units, "blue", &blue);
    summarize(&director, &units, "red", &red);
    log::info!(
        "survivors: blue {}, red {}",
        survivors(&units, BLUE),
        survivors(&units, RED)
    );
    Ok(())
}

fn log_event(event: &TacticalEvent) {
    match event {
        TacticalEvent::PhaseChanged { .. } | TacticalEvent::ContactReported { .. } => {
            log::debug!("{:?}", event)
        }
        _ => log::info!("{:?}", event),
    }
}

fn summarize(director: &TacticalDirector, units: &World, side: &str, squads: &[SquadId]) {
    for squad in squads.iter().filter_map(|&id| director.squad(id)) {
        log::info!(
            "{} squad {} ({:?}): {:?}, {} alive, health {:.0}%, threat {:.2}",
            side,
            squad.id,
            squad.role,
            squad.phase,
            squad.len(),
            squad.average_health * 100.0,
            director.squad_threat(squad.id, units).unwrap_or_default()
        );
    }
}

fn survivors(units: &World, faction: Faction) -> usize {
    units
        .query::<(&Health, &Faction)>()
        .iter()
        .filter(|(_, (health, f))| **f == faction && !health.is_dead())
        .count()
}
