//! Simulation World - main orchestrator
//!
//! Owns the hecs entity store and the chunk grid. Chunk membership is only
//! ever changed through intentions (pending add/remove, despawn queue) that
//! `flush_deferred` applies at the start of each frame.

use hecs::{Entity, World};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace, warn};

use crate::chunk::{ChunkCoord, ChunkGrid};
use crate::components::*;
use crate::config::EngineConfig;
use crate::context::SimContext;
use crate::error::{EngineError, MoveError, Result};
use crate::geometry::{Vec2f, Vec2i};
use crate::input::InputSnapshot;
use crate::systems;

/// Notifications produced while the world runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// `entity` was touched by `other` during an attempted move
    Collision { entity: Entity, other: Entity },
    ChunkTraversed { entity: Entity, chunk: ChunkCoord },
    /// Parked entity materialized because its chunk loaded
    Woken { entity: Entity, chunk: ChunkCoord },
    Destroyed { entity: Entity },
}

/// Counts from one flush of every chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub removed: usize,
    pub added: usize,
    pub despawned: usize,
}

/// Result of running one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    pub flush: FlushStats,
    pub updated: usize,
    pub collisions: usize,
    pub loaded_chunks: usize,
    /// Entities of loaded chunks bucketed by sprite level, background first
    pub render_lists: Vec<Vec<Entity>>,
    pub camera: Vec2i,
    pub events: Vec<WorldEvent>,
}

pub struct SimulationWorld {
    pub world: World,
    pub grid: ChunkGrid,
    pub config: EngineConfig,
    pub ctx: SimContext,
    /// Camera offset, shifted by moves of camera-following entities
    pub camera: Vec2i,
    pub(crate) events: Vec<WorldEvent>,
    pub(crate) pending_despawn: Vec<Entity>,
    /// Chunks each entity was unregistered from since the last flush, whose
    /// live sets still hold it until their removals are applied
    pub(crate) departures: HashMap<Entity, Vec<ChunkCoord>>,
}

impl SimulationWorld {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let grid = ChunkGrid::new(config.grid_dimension, config.chunk_size, config.world_size)?;

        info!(
            grid = config.grid_dimension,
            chunk_size = config.chunk_size,
            world_size = config.world_size,
            "Simulation world created"
        );

        Ok(Self {
            world: World::new(),
            grid,
            ctx: SimContext::new(config.rng_seed),
            config,
            camera: Vec2i::ZERO,
            events: Vec::new(),
            pending_despawn: Vec::new(),
            departures: HashMap::new(),
        })
    }

    // ========================================================================
    // Entity lifecycle
    // ========================================================================

    /// Create an entity and queue it into the chunk under its position.
    ///
    /// Entities that recenter the load window get their traversal callback
    /// right away so the chunks around them load on spawn.
    pub fn spawn(&mut self, blueprint: Blueprint) -> Result<Entity> {
        let traversal = blueprint.behavior.traversal;
        let provisional = self
            .grid
            .coord_of(blueprint.position)
            .ok_or(EngineError::PositionOutsideWorld(blueprint.position))?;

        let entity = self.spawn_components(blueprint, Residence::Resident(provisional))?;
        let coord = self.register_entity(entity)?;

        if traversal == TraversalPolicy::RecenterLoadedRadius {
            systems::streaming::on_chunk_traverse(self, entity, coord);
        }
        Ok(entity)
    }

    /// Re-attach a previously serialized entity to the chunk it last occupied.
    pub fn attach_entity(&mut self, blueprint: Blueprint, chunk: ChunkCoord, parked: bool) -> Result<Entity> {
        // Validate before spawning so a bad record leaves nothing behind
        self.grid.chunk(chunk)?;

        let residence = if parked {
            Residence::Parked(chunk)
        } else {
            Residence::Resident(chunk)
        };
        let entity = self.spawn_components(blueprint, residence)?;

        let target = self.grid.chunk_mut(chunk)?;
        if parked {
            target.park(entity);
        } else {
            target.enqueue_add(entity);
        }
        trace!(?entity, %chunk, parked, "Entity attached");
        Ok(entity)
    }

    fn spawn_components(&mut self, blueprint: Blueprint, residence: Residence) -> Result<Entity> {
        let level = SpriteLevel::clamped(blueprint.sprite_level, self.config.sprite_level_count);
        let piloted = matches!(blueprint.behavior.movement, MovementPolicy::Piloted { .. });

        let entity = self.world.spawn((
            Position(blueprint.position),
            Colliders(blueprint.colliders),
            Collidable(blueprint.collidable),
            level,
            blueprint.behavior,
            Velocity(blueprint.velocity),
            residence,
        ));

        if let Some(animation) = blueprint.animation {
            self.world
                .insert_one(entity, animation)
                .map_err(|_| EngineError::NoSuchEntity(entity))?;
        }
        if piloted {
            self.world
                .insert_one(entity, Thruster::default())
                .map_err(|_| EngineError::NoSuchEntity(entity))?;
        }
        Ok(entity)
    }

    /// Queue the entity into the pending-add buffer of the chunk under its
    /// position. Does not check for duplicate registration.
    pub fn register_entity(&mut self, entity: Entity) -> Result<ChunkCoord> {
        let position = self.position(entity).ok_or(EngineError::NoSuchEntity(entity))?;
        let coord = self
            .grid
            .coord_of(position)
            .ok_or(EngineError::PositionOutsideWorld(position))?;

        self.grid.chunk_mut(coord)?.enqueue_add(entity);
        self.set_residence(entity, Residence::Resident(coord))?;
        trace!(?entity, %coord, "Entity registered");
        Ok(coord)
    }

    /// Queue removal from the entity's current chunk. A parked entity simply
    /// leaves the unloaded-transition buffer.
    pub fn unregister_entity(&mut self, entity: Entity) -> Result<()> {
        match self.residence(entity)? {
            Residence::Resident(coord) => {
                self.grid.chunk_mut(coord)?.enqueue_remove(entity);
                self.departures.entry(entity).or_default().push(coord);
            }
            Residence::Parked(coord) => {
                self.grid.chunk_mut(coord)?.unpark(entity);
            }
        }
        Ok(())
    }

    /// Unregister and despawn at the next flush. Repeated calls are no-ops.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if self.pending_despawn.contains(&entity) {
            return Ok(());
        }
        self.unregister_entity(entity)?;
        self.pending_despawn.push(entity);
        Ok(())
    }

    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.pending_despawn.contains(&entity)
    }

    /// Apply every queued intention: removals, then adds, per chunk; then
    /// despawns. Apart from wake-on-load, the only place live sets change.
    pub fn flush_deferred(&mut self) -> FlushStats {
        let doomed: HashSet<Entity> = self.pending_despawn.drain(..).collect();
        self.departures.clear();
        let mut stats = FlushStats::default();

        for chunk in self.grid.iter_mut() {
            let flushed = chunk.flush(|e| doomed.contains(&e));
            stats.removed += flushed.removed;
            stats.added += flushed.added;
        }

        for entity in doomed {
            // Moved after destroy: may still sit in a parked buffer
            if let Ok(Residence::Parked(coord)) = self.residence(entity) {
                if let Ok(chunk) = self.grid.chunk_mut(coord) {
                    chunk.unpark(entity);
                }
            }
            if self.world.despawn(entity).is_ok() {
                stats.despawned += 1;
                self.events.push(WorldEvent::Destroyed { entity });
            }
        }

        if stats != FlushStats::default() {
            debug!(
                removed = stats.removed,
                added = stats.added,
                despawned = stats.despawned,
                "Deferred mutations flushed"
            );
        }
        stats
    }

    // ========================================================================
    // Chunks, movement, collision
    // ========================================================================

    pub fn is_chunk_loaded(&self, coord: ChunkCoord) -> bool {
        self.grid.is_loaded(coord)
    }

    /// Load exactly the window around `focus`; returns the entities woken.
    pub fn set_loaded_radius(&mut self, focus: ChunkCoord, radius: u32) -> Vec<Entity> {
        systems::streaming::set_loaded_radius(self, focus, radius)
    }

    pub fn move_entity(&mut self, entity: Entity, dx: i32, dy: i32) -> std::result::Result<(), MoveError> {
        systems::movement::move_entity(self, entity, dx, dy)
    }

    /// Add `force / mass` to the entity's velocity, capped at `max_speed`.
    /// Stationary entities ignore forces.
    pub fn apply_force(&mut self, entity: Entity, force: Vec2f) -> bool {
        let mass = match self.behavior(entity).map(|b| b.movement) {
            Some(MovementPolicy::Inertial { mass }) | Some(MovementPolicy::Piloted { mass, .. }) => mass,
            _ => return false,
        };
        let mass = if mass > 0.0 { mass } else { 1.0 };
        let max_speed = self.config.max_speed;

        match self.world.get::<&mut Velocity>(entity) {
            Ok(mut velocity) => {
                velocity.0 = (velocity.0 + force / mass).clamp_length(max_speed);
                true
            }
            Err(_) => false,
        }
    }

    /// Deliver a collision notification to `entity` about `other`.
    pub fn notify_collision(&mut self, entity: Entity, other: Entity) {
        self.events.push(WorldEvent::Collision { entity, other });

        if let Some(Behavior {
            collision: CollisionResponse::Destroy,
            ..
        }) = self.behavior(entity)
        {
            if let Err(err) = self.destroy(entity) {
                warn!(?entity, %err, "Collision response could not destroy entity");
            }
        }
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// One frame: flush intentions, update every loaded entity, hand off
    /// render lists and the events raised since the last frame.
    pub fn frame(&mut self, input: &InputSnapshot, delta_ms: u32) -> FrameReport {
        let flush = self.flush_deferred();
        let updated = systems::update_system(self, input, delta_ms);
        self.ctx.advance(delta_ms);

        let events = self.drain_events();
        let collisions = events
            .iter()
            .filter(|e| matches!(e, WorldEvent::Collision { .. }))
            .count();

        FrameReport {
            frame: self.ctx.frame,
            flush,
            updated,
            collisions,
            loaded_chunks: self.grid.loaded_count(),
            render_lists: self.render_lists(),
            camera: self.camera,
            events,
        }
    }

    /// `sprite_level_count + 1` buckets; the last one holds fallback levels.
    pub fn render_lists(&self) -> Vec<Vec<Entity>> {
        let mut lists = vec![Vec::new(); self.config.sprite_level_count as usize + 1];
        for (_, chunk) in self.grid.loaded_chunks() {
            for &entity in chunk.entities() {
                if let Ok(level) = self.world.get::<&SpriteLevel>(entity) {
                    if let Some(list) = lists.get_mut(level.get() as usize) {
                        list.push(entity);
                    }
                }
            }
        }
        lists
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn position(&self, entity: Entity) -> Option<Vec2i> {
        self.world.get::<&Position>(entity).ok().map(|p| p.0)
    }

    pub(crate) fn set_position(&mut self, entity: Entity, position: Vec2i) {
        if let Ok(mut pos) = self.world.get::<&mut Position>(entity) {
            pos.0 = position;
        }
    }

    pub fn residence(&self, entity: Entity) -> Result<Residence> {
        self.world
            .get::<&Residence>(entity)
            .map(|r| *r)
            .map_err(|_| EngineError::NoSuchEntity(entity))
    }

    pub(crate) fn set_residence(&mut self, entity: Entity, residence: Residence) -> Result<()> {
        *self
            .world
            .get::<&mut Residence>(entity)
            .map_err(|_| EngineError::NoSuchEntity(entity))? = residence;
        Ok(())
    }

    pub fn behavior(&self, entity: Entity) -> Option<Behavior> {
        self.world.get::<&Behavior>(entity).ok().map(|b| *b)
    }

    pub fn velocity(&self, entity: Entity) -> Option<Vec2f> {
        self.world.get::<&Velocity>(entity).ok().map(|v| v.0)
    }

    pub fn sprite_level(&self, entity: Entity) -> Option<u8> {
        self.world.get::<&SpriteLevel>(entity).ok().map(|l| l.get())
    }

    /// Reassign the sprite level, clamping out-of-range values.
    pub fn set_sprite_level(&mut self, entity: Entity, requested: i32) -> Result<()> {
        let level = SpriteLevel::clamped(requested, self.config.sprite_level_count);
        *self
            .world
            .get::<&mut SpriteLevel>(entity)
            .map_err(|_| EngineError::NoSuchEntity(entity))? = level;
        Ok(())
    }

    /// Every entity in every chunk (live, pending or parked), in no
    /// particular order. Entities queued for destruction are left out.
    pub fn entities(&self) -> Vec<Entity> {
        self.world
            .query::<&Residence>()
            .iter()
            .map(|(entity, _)| entity)
            .filter(|e| !self.pending_despawn.contains(e))
            .collect()
    }

    /// Chunks whose live set currently contains `entity`.
    pub fn live_chunks_of(&self, entity: Entity) -> Vec<ChunkCoord> {
        self.grid
            .iter()
            .filter(|(_, chunk)| chunk.contains(entity))
            .map(|(coord, _)| coord)
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    pub fn current_frame(&self) -> u64 {
        self.ctx.frame
    }
}
