//! Chunkworld headless demo
//!
//! Spawns a player ship among scattered asteroids and flies it on a scripted
//! course, logging chunk streaming and collisions. Pass a JSON engine config
//! path as the first argument to override the defaults.

use simulation::{prefabs, EngineConfig, InputSnapshot, SimulationWorld, Vec2i, WorldEvent};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const FRAMES: u32 = 600;
const ASTEROIDS: usize = 5_000;

/// Scripted pilot: long eastward legs with a diagonal climb every 150 frames
fn scripted_input(frame: u32) -> InputSnapshot {
    match frame % 150 {
        0..=99 => InputSnapshot {
            right: true,
            ..Default::default()
        },
        100..=119 => InputSnapshot {
            up: true,
            right: true,
            ..Default::default()
        },
        _ => InputSnapshot::idle(),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let frame_ms = config.frame_interval_ms as u32;

    info!("Chunkworld simulation starting...");
    let mut world = SimulationWorld::new(config)?;

    world.scatter_asteroids(ASTEROIDS, Vec2i::new(20, 20))?;
    let center = world.config.world_size / 2;
    let player = world.spawn(prefabs::player_ship(Vec2i::new(center, center)))?;
    info!(
        entities = world.entity_count(),
        loaded_chunks = world.grid.loaded_count(),
        "World seeded"
    );

    let start = std::time::Instant::now();
    let mut collisions = 0usize;
    let mut traversals = 0usize;
    let mut woken = 0usize;

    for frame in 0..FRAMES {
        let report = world.frame(&scripted_input(frame), frame_ms);
        collisions += report.collisions;
        for event in &report.events {
            match event {
                WorldEvent::ChunkTraversed { entity, .. } if *entity == player => traversals += 1,
                WorldEvent::Woken { .. } => woken += 1,
                _ => {}
            }
        }
    }
    let elapsed = start.elapsed();

    let memory_mb = memory_stats::memory_stats()
        .map(|stats| stats.physical_mem as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);

    info!(
        "Run complete: {:?} total, {:?} per frame, {} collisions, {} player chunk traversals, {} entities woken",
        elapsed,
        elapsed / FRAMES,
        collisions,
        traversals,
        woken
    );
    info!(
        position = ?world.position(player),
        camera = ?world.camera,
        memory_mb,
        "Final state"
    );

    Ok(())
}
