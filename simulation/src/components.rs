//! ECS Components for simulated entities
//!
//! Every entity is one hecs entity carrying the same core record. What an
//! entity does is decided by its `Behavior` table, not by its type.

use serde::{Deserialize, Serialize};

use crate::chunk::ChunkCoord;
use crate::geometry::{Aabb, Vec2f, Vec2i};

// ============================================================================
// Spatial Components
// ============================================================================

/// World-space position in whole grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position(pub Vec2i);

/// Box attached to an entity at an entity-local offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collider {
    pub size: Vec2i,
    pub offset: Vec2i,
}

impl Collider {
    pub const fn new(size: Vec2i) -> Self {
        Self {
            size,
            offset: Vec2i::ZERO,
        }
    }

    pub const fn with_offset(size: Vec2i, offset: Vec2i) -> Self {
        Self { size, offset }
    }

    /// World-space box for an owner standing at `position`
    pub fn at(&self, position: Vec2i) -> Aabb {
        Aabb::new(position + self.offset, self.size)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colliders(pub Vec<Collider>);

/// Whether the entity takes part in collision tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collidable(pub bool);

/// Which chunk the entity last resolved into.
///
/// Only a lookup key into the chunk grid; the chunk owns membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Residence {
    /// Queued for, or present in, the chunk's live set
    Resident(ChunkCoord),
    /// Waiting in the chunk's unloaded-transition buffer
    Parked(ChunkCoord),
}

impl Residence {
    pub fn chunk(&self) -> ChunkCoord {
        match *self {
            Residence::Resident(c) | Residence::Parked(c) => c,
        }
    }

    pub fn is_parked(&self) -> bool {
        matches!(self, Residence::Parked(_))
    }
}

// ============================================================================
// Render / Animation Components
// ============================================================================

/// Draw-order bucket. Level 0 paints first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteLevel(u8);

impl SpriteLevel {
    /// Out-of-range requests fall back to the lowest priority, `level_count`.
    pub fn clamped(requested: i32, level_count: u8) -> Self {
        if requested >= 0 && requested < level_count as i32 {
            SpriteLevel(requested as u8)
        } else {
            SpriteLevel(level_count)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Frame cursor owned by the animation collaborator; the core only ticks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub frame: u32,
    pub frame_count: u32,
}

impl Animation {
    pub fn new(frame_count: u32) -> Self {
        Self {
            frame: 0,
            frame_count,
        }
    }

    pub fn advance(&mut self) {
        if self.frame_count > 0 {
            self.frame = (self.frame + 1) % self.frame_count;
        }
    }
}

// ============================================================================
// Motion Components
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2f);

/// Throttle state of a piloted entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thruster {
    pub ms_since_thrust: u32,
}

// ============================================================================
// Behavior Table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementPolicy {
    /// Never moves on its own
    Stationary,
    /// Moves by its velocity every frame
    Inertial { mass: f32 },
    /// Input accelerates it, then it moves like `Inertial`
    Piloted { thrust: f32, mass: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionResponse {
    /// Record the collision event only
    Notify,
    /// Destroy self at the next flush
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalPolicy {
    Ignore,
    /// Recenter the chunk load window on the entity's new chunk
    RecenterLoadedRadius,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub movement: MovementPolicy,
    pub collision: CollisionResponse,
    pub traversal: TraversalPolicy,
    /// Successful moves shift the camera by the same delta
    pub follow_camera: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            movement: MovementPolicy::Stationary,
            collision: CollisionResponse::Notify,
            traversal: TraversalPolicy::Ignore,
            follow_camera: false,
        }
    }
}

// ============================================================================
// Blueprint
// ============================================================================

/// Everything needed to (re)create an entity. Used by spawning and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub position: Vec2i,
    pub colliders: Vec<Collider>,
    pub collidable: bool,
    /// Requested level, clamped on spawn
    pub sprite_level: i32,
    pub behavior: Behavior,
    pub velocity: Vec2f,
    pub animation: Option<Animation>,
}

impl Blueprint {
    pub fn new(position: Vec2i) -> Self {
        Self {
            position,
            colliders: Vec::new(),
            collidable: true,
            sprite_level: 5,
            behavior: Behavior::default(),
            velocity: Vec2f::ZERO,
            animation: None,
        }
    }

    pub fn collider(mut self, collider: Collider) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn sprite_level(mut self, level: i32) -> Self {
        self.sprite_level = level;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn collidable(mut self, collidable: bool) -> Self {
        self.collidable = collidable;
        self
    }

    pub fn velocity(mut self, velocity: Vec2f) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn animation(mut self, animation: Animation) -> Self {
        self.animation = Some(animation);
        self
    }
}
