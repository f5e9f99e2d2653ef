//! Collision System
//!
//! AABB sweep of a mover against every live entity of every loaded chunk.

use hecs::{Entity, World};
use rayon::prelude::*;

use crate::components::{Collidable, Colliders, Position};
use crate::geometry::Aabb;
use crate::world::SimulationWorld;

/// World-space boxes of an entity, `None` if it lacks a position or colliders.
fn world_boxes(world: &World, entity: Entity) -> Option<Vec<Aabb>> {
    let position = world.get::<&Position>(entity).ok()?.0;
    let colliders = world.get::<&Colliders>(entity).ok()?;
    Some(colliders.0.iter().map(|c| c.at(position)).collect())
}

fn is_collidable(world: &World, entity: Entity) -> bool {
    world.get::<&Collidable>(entity).map(|c| c.0).unwrap_or(false)
}

fn hits_any(world: &World, boxes: &[Aabb], other: Entity) -> bool {
    if !is_collidable(world, other) {
        return false;
    }
    match world_boxes(world, other) {
        Some(theirs) => boxes.iter().any(|a| theirs.iter().any(|b| a.overlaps(b))),
        None => false,
    }
}

/// True if any collider of `a` overlaps any collider of `b` at their current
/// positions. Ignores the collidable flag.
pub fn is_colliding_with(world: &World, a: Entity, b: Entity) -> bool {
    match (world_boxes(world, a), world_boxes(world, b)) {
        (Some(ours), Some(theirs)) => ours.iter().any(|x| theirs.iter().any(|y| x.overlaps(y))),
        _ => false,
    }
}

/// Every collidable entity in a loaded chunk that overlaps `mover` at its
/// current position. The mover itself and unloaded chunks are skipped, and
/// the sweep never stops early: all overlapping entities are returned.
pub fn scan(sim: &SimulationWorld, mover: Entity) -> Vec<Entity> {
    let world = &sim.world;
    let boxes = match world_boxes(world, mover) {
        Some(boxes) if !boxes.is_empty() => boxes,
        _ => return Vec::new(),
    };

    let candidates: Vec<Entity> = sim
        .grid
        .loaded_chunks()
        .flat_map(|(_, chunk)| chunk.entities().iter().copied())
        .filter(|&e| e != mover)
        .collect();

    if candidates.len() >= sim.config.parallel_scan_threshold {
        candidates
            .par_iter()
            .copied()
            .filter(|&other| hits_any(world, &boxes, other))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|&other| hits_any(world, &boxes, other))
            .collect()
    }
}
