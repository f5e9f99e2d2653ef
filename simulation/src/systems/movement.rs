//! Movement System
//!
//! All-or-nothing translation: bounds check, tentative commit, collision
//! gate, then chunk traversal.

use hecs::Entity;
use tracing::trace;

use crate::components::Collidable;
use crate::error::MoveError;
use crate::geometry::Vec2i;
use crate::systems::{collision, streaming};
use crate::world::SimulationWorld;

/// Try to move `entity` by `(dx, dy)`.
///
/// On any error the position is exactly what it was before the call. A
/// collision still notifies both parties of every overlapping pair first.
pub fn move_entity(sim: &mut SimulationWorld, entity: Entity, dx: i32, dy: i32) -> Result<(), MoveError> {
    let origin = sim.position(entity).ok_or(MoveError::NoSuchEntity(entity))?;
    let delta = Vec2i::new(dx, dy);

    let destination = origin
        .checked_offset(dx, dy)
        .filter(|p| sim.grid.contains_point(*p))
        .ok_or(MoveError::OutOfBounds {
            position: origin,
            delta,
        })?;

    sim.set_position(entity, destination);

    let collidable = sim.world.get::<&Collidable>(entity).map(|c| c.0).unwrap_or(false);
    if collidable {
        let hits = collision::scan(sim, entity);
        if !hits.is_empty() {
            for &other in &hits {
                sim.notify_collision(entity, other);
                sim.notify_collision(other, entity);
            }
            sim.set_position(entity, origin);
            trace!(?entity, ?origin, ?destination, hits = hits.len(), "Move rejected by collision");
            return Err(MoveError::CollisionRejected { hits: hits.len() });
        }
    }

    let current = sim
        .residence(entity)
        .map_err(|_| MoveError::NoSuchEntity(entity))?
        .chunk();
    if let Some(target) = sim.grid.coord_of(destination) {
        if target != current {
            streaming::traverse(sim, entity, target);
        }
    }

    if sim.behavior(entity).map(|b| b.follow_camera).unwrap_or(false) {
        sim.camera += delta;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCoord;
    use crate::components::{Behavior, Blueprint, Collider, CollisionResponse, Residence};
    use crate::config::EngineConfig;
    use crate::prefabs;
    use crate::world::WorldEvent;

    fn world(dimension: u32, chunk_size: i32) -> SimulationWorld {
        SimulationWorld::new(EngineConfig::with_grid(dimension, chunk_size)).unwrap()
    }

    fn square(position: Vec2i, size: i32) -> Blueprint {
        prefabs::prop(position, Vec2i::new(size, size))
    }

    #[test]
    fn test_out_of_bounds_leaves_position_untouched() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(9, 0), 2);
        let edge = Vec2i::new(sim.config.world_size - 1, 0);
        let e = sim.spawn(square(edge, 1)).unwrap();
        sim.flush_deferred();

        assert_eq!(
            sim.move_entity(e, 1, 0),
            Err(MoveError::OutOfBounds {
                position: edge,
                delta: Vec2i::new(1, 0)
            })
        );
        assert_eq!(sim.position(e), Some(edge));
        assert!(sim.move_entity(e, 0, -1).is_err());
        assert!(sim.move_entity(e, i32::MAX, 0).is_err());
        assert_eq!(sim.position(e), Some(edge));

        // Non-collidable entities hit the same wall
        let ghost = sim.spawn(square(edge, 1).collidable(false)).unwrap();
        assert!(matches!(sim.move_entity(ghost, 1, 0), Err(MoveError::OutOfBounds { .. })));
    }

    #[test]
    fn test_collision_rolls_back_and_notifies_both() {
        let mut sim = world(100, 100);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 3);
        let mover = sim.spawn(square(Vec2i::new(0, 0), 10)).unwrap();
        let wall = sim.spawn(square(Vec2i::new(10, 10), 10)).unwrap();
        sim.flush_deferred();

        // Destination (5,5) overlaps the wall's [10,20) box
        assert_eq!(
            sim.move_entity(mover, 5, 5),
            Err(MoveError::CollisionRejected { hits: 1 })
        );
        assert_eq!(sim.position(mover), Some(Vec2i::new(0, 0)));

        let events = sim.drain_events();
        assert!(events.contains(&WorldEvent::Collision { entity: mover, other: wall }));
        assert!(events.contains(&WorldEvent::Collision { entity: wall, other: mover }));
    }

    #[test]
    fn test_collision_with_occupant_of_destination() {
        let mut sim = world(100, 100);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 3);
        let mover = sim.spawn(square(Vec2i::new(0, 0), 10)).unwrap();
        let other = sim.spawn(square(Vec2i::new(5, 5), 10)).unwrap();
        sim.flush_deferred();

        assert!(matches!(
            sim.move_entity(mover, 5, 5),
            Err(MoveError::CollisionRejected { .. })
        ));
        assert_eq!(sim.position(mover), Some(Vec2i::new(0, 0)));
        let events = sim.drain_events();
        assert!(events.contains(&WorldEvent::Collision { entity: mover, other }));
        assert!(events.contains(&WorldEvent::Collision { entity: other, other: mover }));
    }

    #[test]
    fn test_every_collided_pair_is_notified() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 20);
        let mover = sim.spawn(square(Vec2i::new(20, 20), 4)).unwrap();
        let left = sim.spawn(square(Vec2i::new(17, 24), 4)).unwrap();
        let right = sim.spawn(square(Vec2i::new(23, 24), 4)).unwrap();
        sim.flush_deferred();

        assert_eq!(
            sim.move_entity(mover, 0, 2),
            Err(MoveError::CollisionRejected { hits: 2 })
        );
        let collisions: Vec<WorldEvent> = sim
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, WorldEvent::Collision { .. }))
            .collect();
        assert_eq!(collisions.len(), 4);
        for other in [left, right] {
            assert!(collisions.contains(&WorldEvent::Collision { entity: mover, other }));
            assert!(collisions.contains(&WorldEvent::Collision { entity: other, other: mover }));
        }
    }

    #[test]
    fn test_touching_edges_do_not_block() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 20);
        let mover = sim.spawn(square(Vec2i::new(0, 0), 10)).unwrap();
        sim.spawn(square(Vec2i::new(15, 0), 10)).unwrap();
        sim.flush_deferred();

        assert_eq!(sim.move_entity(mover, 5, 0), Ok(()));
        assert_eq!(sim.position(mover), Some(Vec2i::new(5, 0)));
    }

    #[test]
    fn test_non_collidable_mover_skips_scan() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 20);
        let mover = sim.spawn(square(Vec2i::new(0, 0), 10).collidable(false)).unwrap();
        sim.spawn(square(Vec2i::new(5, 5), 10)).unwrap();
        sim.flush_deferred();

        assert_eq!(sim.move_entity(mover, 5, 5), Ok(()));
        assert!(sim.drain_events().is_empty());
    }

    #[test]
    fn test_destroy_response_runs_at_next_flush() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 20);
        let mover = sim.spawn(square(Vec2i::new(0, 0), 4)).unwrap();
        let mine = Blueprint::new(Vec2i::new(6, 0))
            .collider(Collider::new(Vec2i::new(4, 4)))
            .behavior(Behavior {
                collision: CollisionResponse::Destroy,
                ..Default::default()
            });
        let mine = sim.spawn(mine).unwrap();
        sim.flush_deferred();

        assert!(sim.move_entity(mover, 3, 0).is_err());
        assert!(sim.world.contains(mine));
        sim.flush_deferred();
        assert!(!sim.world.contains(mine));
        assert!(sim.world.contains(mover));
    }

    #[test]
    fn test_crossing_into_loaded_chunk_requeues() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 2);
        let e = sim.spawn(square(Vec2i::new(8, 0), 1)).unwrap();
        sim.flush_deferred();

        sim.move_entity(e, 3, 0).unwrap();
        let target = ChunkCoord::new(1, 0);
        assert_eq!(sim.residence(e).unwrap(), Residence::Resident(target));
        assert!(sim.drain_events().contains(&WorldEvent::ChunkTraversed { entity: e, chunk: target }));

        sim.flush_deferred();
        assert_eq!(sim.live_chunks_of(e), vec![target]);
    }

    #[test]
    fn test_back_and_forth_in_one_frame_keeps_single_membership() {
        let mut sim = world(10, 10);
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 2);
        let e = sim.spawn(square(Vec2i::new(9, 0), 1)).unwrap();
        sim.flush_deferred();

        sim.move_entity(e, 1, 0).unwrap();
        sim.move_entity(e, -1, 0).unwrap();
        sim.flush_deferred();
        assert_eq!(sim.live_chunks_of(e), vec![ChunkCoord::new(0, 0)]);
    }

    #[test]
    fn test_camera_follows_successful_moves_only() {
        let mut sim = world(10, 10);
        let player = sim.spawn(prefabs::player_ship(Vec2i::new(30, 30))).unwrap();
        sim.spawn(square(Vec2i::new(40, 30), 5)).unwrap();
        sim.flush_deferred();

        sim.move_entity(player, -2, 0).unwrap();
        assert_eq!(sim.camera, Vec2i::new(-2, 0));
        assert!(sim.move_entity(player, 5, 0).is_err());
        assert_eq!(sim.camera, Vec2i::new(-2, 0));
    }
}
