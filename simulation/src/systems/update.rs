//! Update System
//!
//! Per-frame hook for every entity resident in a loaded chunk: animation
//! tick, pilot thrust, inertial drift.

use hecs::Entity;
use tracing::trace;

use crate::components::{Animation, MovementPolicy, Thruster, Velocity};
use crate::geometry::Vec2f;
use crate::input::InputSnapshot;
use crate::world::SimulationWorld;

/// Update every entity of every loaded chunk. Iterates a snapshot taken up
/// front, so membership changes queued by updates wait for the next flush.
/// Returns the number of entities updated.
pub fn update_system(sim: &mut SimulationWorld, input: &InputSnapshot, delta_ms: u32) -> usize {
    let snapshot: Vec<Entity> = sim
        .grid
        .loaded_chunks()
        .flat_map(|(_, chunk)| chunk.entities().iter().copied())
        .collect();

    let mut updated = 0;
    for entity in snapshot {
        let Some(behavior) = sim.behavior(entity) else {
            continue;
        };

        if let Ok(mut animation) = sim.world.get::<&mut Animation>(entity) {
            animation.advance();
        }

        match behavior.movement {
            MovementPolicy::Stationary => {}
            MovementPolicy::Inertial { .. } => drift(sim, entity),
            MovementPolicy::Piloted { thrust, .. } => {
                pilot(sim, entity, input, delta_ms, thrust);
                drift(sim, entity);
            }
        }
        updated += 1;
    }
    updated
}

/// Apply input thrust once the throttle interval has elapsed.
fn pilot(sim: &mut SimulationWorld, entity: Entity, input: &InputSnapshot, delta_ms: u32, thrust: f32) {
    let interval = sim.config.player_move_interval_ms;
    {
        let Ok(mut thruster) = sim.world.get::<&mut Thruster>(entity) else {
            return;
        };
        if thruster.ms_since_thrust < interval {
            thruster.ms_since_thrust = thruster.ms_since_thrust.saturating_add(delta_ms);
            return;
        }
        thruster.ms_since_thrust = 0;
    }

    if let Some(direction) = input.direction() {
        sim.apply_force(entity, direction * thrust);
    }
}

/// Move by the rounded velocity. A refused move stops the entity.
fn drift(sim: &mut SimulationWorld, entity: Entity) {
    let Some(velocity) = sim.velocity(entity) else {
        return;
    };
    let step = velocity.round();
    if step.is_zero() {
        return;
    }

    if let Err(err) = sim.move_entity(entity, step.x, step.y) {
        trace!(?entity, %err, "Drift stopped");
        if let Ok(mut v) = sim.world.get::<&mut Velocity>(entity) {
            v.0 = Vec2f::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCoord;
    use crate::components::Animation;
    use crate::config::EngineConfig;
    use crate::geometry::Vec2i;
    use crate::prefabs;

    fn loaded_world(config: EngineConfig) -> SimulationWorld {
        let mut sim = SimulationWorld::new(config).unwrap();
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 50);
        sim
    }

    #[test]
    fn test_only_loaded_chunks_update() {
        let mut sim = SimulationWorld::new(EngineConfig::with_grid(10, 10)).unwrap();
        sim.set_loaded_radius(ChunkCoord::new(0, 0), 1);
        let near = sim
            .spawn(prefabs::prop(Vec2i::new(1, 1), Vec2i::new(1, 1)).animation(Animation::new(4)))
            .unwrap();
        let far = sim
            .spawn(prefabs::prop(Vec2i::new(50, 50), Vec2i::new(1, 1)).animation(Animation::new(4)))
            .unwrap();

        let report = sim.frame(&InputSnapshot::idle(), 40);
        assert_eq!(report.updated, 1);
        assert_eq!(sim.world.get::<&Animation>(near).unwrap().frame, 1);
        assert_eq!(sim.world.get::<&Animation>(far).unwrap().frame, 0);
    }

    #[test]
    fn test_drifter_stops_at_world_edge() {
        let mut sim = loaded_world(EngineConfig::with_grid(10, 10));
        let e = sim
            .spawn(prefabs::drifter(Vec2i::new(96, 0), Vec2i::new(1, 1), Vec2f::new(2.0, 0.0)))
            .unwrap();

        sim.frame(&InputSnapshot::idle(), 40);
        assert_eq!(sim.position(e), Some(Vec2i::new(98, 0)));
        sim.frame(&InputSnapshot::idle(), 40);
        assert_eq!(sim.position(e), Some(Vec2i::new(98, 0)));
        assert_eq!(sim.velocity(e), Some(Vec2f::ZERO));
    }

    #[test]
    fn test_pilot_thrust_follows_input() {
        let mut sim = loaded_world(EngineConfig::with_grid(10, 10));
        let player = sim.spawn(prefabs::player_ship(Vec2i::new(50, 50))).unwrap();
        sim.flush_deferred();

        let right = InputSnapshot {
            right: true,
            ..Default::default()
        };
        sim.frame(&right, 40);
        assert_eq!(sim.velocity(player), Some(Vec2f::new(4.0, 0.0)));
        assert_eq!(sim.position(player), Some(Vec2i::new(54, 50)));

        sim.frame(&InputSnapshot::idle(), 40);
        assert_eq!(sim.position(player), Some(Vec2i::new(58, 50)));
    }

    #[test]
    fn test_pilot_throttle_interval() {
        let config = EngineConfig {
            player_move_interval_ms: 100,
            ..EngineConfig::with_grid(10, 10)
        };
        let mut sim = loaded_world(config);
        let player = sim.spawn(prefabs::player_ship(Vec2i::new(10, 10))).unwrap();
        sim.flush_deferred();

        let up = InputSnapshot {
            up: true,
            ..Default::default()
        };
        // 0 -> 40 -> 80 -> 120 ms accumulated, thrust lands on the fourth frame
        for _ in 0..3 {
            sim.frame(&up, 40);
            assert_eq!(sim.velocity(player), Some(Vec2f::ZERO));
        }
        sim.frame(&up, 40);
        assert_eq!(sim.velocity(player), Some(Vec2f::new(0.0, 4.0)));
    }
}
