//! Streaming System
//!
//! Chunk traversal, the traversal callback, and the load window that wakes
//! entities parked in chunks that were unloaded when they arrived.

use hecs::Entity;
use tracing::{debug, warn};

use crate::chunk::ChunkCoord;
use crate::components::{Residence, TraversalPolicy};
use crate::world::{SimulationWorld, WorldEvent};

/// Load exactly the chunks within `radius - 1` of `focus` (Chebyshev
/// distance, clamped to the grid) and wake everything parked in chunks that
/// were not loaded before. Each woken entity joins its chunk's live set and
/// gets exactly one traversal callback. Returns the woken entities.
pub fn set_loaded_radius(sim: &mut SimulationWorld, focus: ChunkCoord, radius: u32) -> Vec<Entity> {
    let newly_loaded = sim.grid.set_loaded_window(focus, radius);

    let mut parked: Vec<(Entity, ChunkCoord)> = Vec::new();
    for coord in newly_loaded {
        let Ok(chunk) = sim.grid.chunk_mut(coord) else {
            continue;
        };
        for entity in chunk.take_parked() {
            // Handles awaiting despawn are dropped, never woken
            if sim.world.contains(entity) && !sim.pending_despawn.contains(&entity) {
                parked.push((entity, coord));
            }
        }
    }

    let mut woken: Vec<(Entity, ChunkCoord)> = Vec::with_capacity(parked.len());
    for (entity, coord) in parked {
        if let Err(err) = sim.set_residence(entity, Residence::Resident(coord)) {
            warn!(?entity, %err, "Parked entity vanished before wake");
            continue;
        }
        // Settle removals still queued in the chunks it left, so it is live
        // in exactly one chunk
        for from in sim.departures.remove(&entity).unwrap_or_default() {
            if let Ok(chunk) = sim.grid.chunk_mut(from) {
                chunk.complete_removal(entity);
            }
        }
        if let Ok(chunk) = sim.grid.chunk_mut(coord) {
            chunk.insert_live(entity);
        }
        sim.push_event(WorldEvent::Woken { entity, chunk: coord });
        woken.push((entity, coord));
    }

    if !woken.is_empty() {
        debug!(%focus, woken = woken.len(), "Parked entities woken");
    }

    // Callbacks last: a recentering callback may load more chunks
    for &(entity, coord) in &woken {
        on_chunk_traverse(sim, entity, coord);
    }

    woken.into_iter().map(|(entity, _)| entity).collect()
}

/// Move `entity` from its current chunk to `target`. Into a loaded chunk it
/// is re-registered and the callback fires now; into an unloaded one it is
/// parked until that chunk loads. Entities queued for destruction are left
/// alone.
pub fn traverse(sim: &mut SimulationWorld, entity: Entity, target: ChunkCoord) {
    // Destroyed entities stay out of every buffer until the flush despawns them
    if sim.is_pending_destroy(entity) {
        return;
    }

    if let Err(err) = sim.unregister_entity(entity) {
        warn!(?entity, %err, "Traversal from unknown chunk");
        return;
    }

    if sim.grid.is_loaded(target) {
        match sim.register_entity(entity) {
            Ok(coord) => on_chunk_traverse(sim, entity, coord),
            Err(err) => warn!(?entity, %err, "Traversal into loaded chunk failed"),
        }
        return;
    }

    match sim.grid.chunk_mut(target) {
        Ok(chunk) => chunk.park(entity),
        Err(err) => {
            warn!(?entity, %err, "Traversal target outside grid");
            return;
        }
    }
    if let Err(err) = sim.set_residence(entity, Residence::Parked(target)) {
        warn!(?entity, %err, "Parked entity has no residence");
    }
    debug!(?entity, %target, "Entity parked in unloaded chunk");
}

/// Hook run whenever an entity's resident chunk changes.
pub fn on_chunk_traverse(sim: &mut SimulationWorld, entity: Entity, chunk: ChunkCoord) {
    sim.push_event(WorldEvent::ChunkTraversed { entity, chunk });

    let policy = sim.behavior(entity).map(|b| b.traversal);
    if policy == Some(TraversalPolicy::RecenterLoadedRadius) {
        let radius = sim.config.chunk_load_radius;
        set_loaded_radius(sim, chunk, radius);
    }
}
