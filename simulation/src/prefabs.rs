//! Prefabs - blueprints for the stock entity kinds
//!
//! Kinds differ only in their colliders and behavior table.

use hecs::Entity;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::info;

use crate::components::*;
use crate::error::Result;
use crate::geometry::{Vec2f, Vec2i};
use crate::world::SimulationWorld;

pub const PLAYER_THRUST: f32 = 4.0;
pub const PLAYER_SPRITE_LEVEL: i32 = 0;
pub const ASTEROID_SPRITE_LEVEL: i32 = 7;

/// Focus entity: piloted, recenters the load window, camera follows it.
pub fn player_ship(position: Vec2i) -> Blueprint {
    Blueprint::new(position)
        .collider(Collider::new(Vec2i::new(9, 9)))
        .sprite_level(PLAYER_SPRITE_LEVEL)
        .behavior(Behavior {
            movement: MovementPolicy::Piloted {
                thrust: PLAYER_THRUST,
                mass: 1.0,
            },
            collision: CollisionResponse::Notify,
            traversal: TraversalPolicy::RecenterLoadedRadius,
            follow_camera: true,
        })
}

/// Stationary collidable box.
pub fn prop(position: Vec2i, size: Vec2i) -> Blueprint {
    Blueprint::new(position).collider(Collider::new(size))
}

/// Box that keeps moving by `velocity` until something stops it.
pub fn drifter(position: Vec2i, size: Vec2i, velocity: Vec2f) -> Blueprint {
    Blueprint::new(position)
        .collider(Collider::new(size))
        .velocity(velocity)
        .behavior(Behavior {
            movement: MovementPolicy::Inertial { mass: 1.0 },
            ..Default::default()
        })
}

/// Uniform draw in `[lo, hi)`, or `lo` when the range is empty.
fn pick(rng: &mut impl Rng, lo: i32, hi: i32) -> i32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Asteroid made of two crossing bars inside a `max_size` box: one full-height
/// bar of random width, one full-width bar of random height.
pub fn asteroid(position: Vec2i, max_size: Vec2i, rng: &mut impl Rng) -> Blueprint {
    let (x, y) = (max_size.x, max_size.y);
    let border_x = (x as f32 * 0.15) as i32;
    let min_x_len = (x as f32 * 0.35) as i32;
    let border_y = (y as f32 * 0.15) as i32;
    let min_y_len = (y as f32 * 0.35) as i32;

    let left = pick(rng, border_x, x / 2 - min_x_len / 2);
    let right = pick(rng, x / 2 + min_x_len / 2, x - border_x);
    let top = pick(rng, border_y, y / 2 - min_y_len / 2);
    let bottom = pick(rng, y / 2 + min_y_len / 2, y - border_y);

    let vertical = Collider::with_offset(
        Vec2i::new((left - right).abs() + 1, y),
        Vec2i::new(left.min(right), 0),
    );
    let horizontal = Collider::with_offset(
        Vec2i::new(x, (top - bottom).abs() + 1),
        Vec2i::new(0, top.min(bottom)),
    );

    Blueprint::new(position)
        .sprite_level(ASTEROID_SPRITE_LEVEL)
        .collider(vertical)
        .collider(horizontal)
}

impl SimulationWorld {
    /// Spawn `count` asteroids at uniformly random positions.
    pub fn scatter_asteroids(&mut self, count: usize, max_size: Vec2i) -> Result<Vec<Entity>> {
        let coords = Uniform::new(0, self.config.world_size);
        let mut spawned = Vec::with_capacity(count);

        for _ in 0..count {
            let position = Vec2i::new(coords.sample(&mut self.ctx.rng), coords.sample(&mut self.ctx.rng));
            let blueprint = asteroid(position, max_size, &mut self.ctx.rng);
            spawned.push(self.spawn(blueprint)?);
        }

        info!(count, "Asteroids scattered");
        Ok(spawned)
    }
}
