//! Chunk grid - fixed arena of chunks with deferred membership buffers
//!
//! Chunks are created once and never destroyed. Live membership only changes
//! in `Chunk::flush` (and when parked entities are woken on load); everything
//! else records intentions in the pending buffers.

use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::geometry::Vec2i;

/// Largest accepted chunks-per-axis count; the arena is allocated up front.
pub const MAX_GRID_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Chunk
// ============================================================================

#[derive(Debug, Default)]
pub struct Chunk {
    loaded: bool,
    entities: Vec<Entity>,
    pending_add: Vec<Entity>,
    pending_remove: Vec<Entity>,
    /// Entities that moved in while the chunk was unloaded
    parked: Vec<Entity>,
}

/// Counts from one chunk flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkFlush {
    pub removed: usize,
    pub added: usize,
}

impl Chunk {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Live members. Order carries no meaning.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn pending_adds(&self) -> &[Entity] {
        &self.pending_add
    }

    pub fn pending_removes(&self) -> &[Entity] {
        &self.pending_remove
    }

    pub fn parked(&self) -> &[Entity] {
        &self.parked
    }

    pub fn enqueue_add(&mut self, entity: Entity) {
        self.pending_add.push(entity);
    }

    /// Queue a removal. A not-yet-flushed add of the same entity is dropped,
    /// so the latest intention for this chunk is the one that sticks.
    pub fn enqueue_remove(&mut self, entity: Entity) {
        self.pending_add.retain(|&e| e != entity);
        self.pending_remove.push(entity);
    }

    pub fn park(&mut self, entity: Entity) {
        if !self.parked.contains(&entity) {
            self.parked.push(entity);
        }
    }

    /// Returns true if the entity was parked here.
    pub fn unpark(&mut self, entity: Entity) -> bool {
        let before = self.parked.len();
        self.parked.retain(|&e| e != entity);
        self.parked.len() != before
    }

    /// Apply a queued removal of `entity` now instead of at the next flush.
    /// Does nothing unless a removal is pending. Returns true if the entity
    /// left the live set.
    pub fn complete_removal(&mut self, entity: Entity) -> bool {
        if !self.pending_remove.contains(&entity) {
            return false;
        }
        self.pending_remove.retain(|&e| e != entity);
        match self.entities.iter().position(|&e| e == entity) {
            Some(idx) => {
                self.entities.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn take_parked(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.parked)
    }

    /// Add straight to the live set. Returns false if already present.
    pub fn insert_live(&mut self, entity: Entity) -> bool {
        if self.entities.contains(&entity) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    /// Apply queued removals, then queued adds. Adds for which `skip` returns
    /// true are dropped (entities despawned in the same flush).
    pub fn flush(&mut self, skip: impl Fn(Entity) -> bool) -> ChunkFlush {
        let mut stats = ChunkFlush::default();

        for entity in self.pending_remove.drain(..) {
            if let Some(idx) = self.entities.iter().position(|&e| e == entity) {
                self.entities.swap_remove(idx);
                stats.removed += 1;
            }
        }

        for entity in self.pending_add.drain(..) {
            if skip(entity) || self.entities.contains(&entity) {
                continue;
            }
            self.entities.push(entity);
            stats.added += 1;
        }

        stats
    }
}

// ============================================================================
// ChunkGrid
// ============================================================================

/// `dimension x dimension` chunks, row-major by `y`.
#[derive(Debug)]
pub struct ChunkGrid {
    chunks: Vec<Chunk>,
    dimension: u32,
    chunk_size: i32,
}

impl ChunkGrid {
    pub fn new(dimension: u32, chunk_size: i32, world_size: i32) -> Result<Self> {
        if dimension > MAX_GRID_DIMENSION {
            return Err(EngineError::InvalidConfig(format!(
                "grid_dimension {} exceeds {}",
                dimension, MAX_GRID_DIMENSION
            )));
        }
        let actual = dimension as i64 * chunk_size as i64;
        if actual != world_size as i64 {
            return Err(EngineError::ConfigurationMismatch {
                grid_dimension: dimension,
                chunk_size,
                world_size,
                actual,
            });
        }

        let count = dimension as usize * dimension as usize;
        let mut chunks = Vec::with_capacity(count);
        chunks.resize_with(count, Chunk::default);

        Ok(Self {
            chunks,
            dimension,
            chunk_size,
        })
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn world_size(&self) -> i32 {
        self.dimension as i32 * self.chunk_size
    }

    /// `[0, world_size)` on both axes
    pub fn contains_point(&self, p: Vec2i) -> bool {
        let size = self.world_size();
        p.x >= 0 && p.x < size && p.y >= 0 && p.y < size
    }

    /// Chunk holding a world position, `None` outside the world.
    pub fn coord_of(&self, p: Vec2i) -> Option<ChunkCoord> {
        if !self.contains_point(p) {
            return None;
        }
        Some(ChunkCoord::new(p.x / self.chunk_size, p.y / self.chunk_size))
    }

    pub fn index(&self, coord: ChunkCoord) -> Option<usize> {
        let dim = self.dimension as i32;
        if coord.x < 0 || coord.y < 0 || coord.x >= dim || coord.y >= dim {
            return None;
        }
        Some(coord.y as usize * self.dimension as usize + coord.x as usize)
    }

    fn coord_at(&self, index: usize) -> ChunkCoord {
        let dim = self.dimension as usize;
        ChunkCoord::new((index % dim) as i32, (index / dim) as i32)
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Result<&Chunk> {
        let idx = self.index(coord).ok_or(EngineError::InvalidChunkCoordinate {
            coord,
            dimension: self.dimension,
        })?;
        Ok(&self.chunks[idx])
    }

    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> Result<&mut Chunk> {
        let idx = self.index(coord).ok_or(EngineError::InvalidChunkCoordinate {
            coord,
            dimension: self.dimension,
        })?;
        Ok(&mut self.chunks[idx])
    }

    /// Out-of-grid coordinates are never loaded.
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.index(coord).map(|idx| self.chunks[idx].loaded).unwrap_or(false)
    }

    pub fn set_loaded(&mut self, coord: ChunkCoord, loaded: bool) -> Result<()> {
        self.chunk_mut(coord)?.loaded = loaded;
        Ok(())
    }

    /// Unload everything, then load the square window of side `2 * radius - 1`
    /// around `focus`, clamped to the grid. Returns the chunks that went from
    /// unloaded to loaded.
    pub fn set_loaded_window(&mut self, focus: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
        let was_loaded: Vec<bool> = self.chunks.iter().map(|c| c.loaded).collect();
        for chunk in &mut self.chunks {
            chunk.loaded = false;
        }

        let mut newly_loaded = Vec::new();
        if radius == 0 {
            return newly_loaded;
        }

        let reach = radius as i64 - 1;
        let max = self.dimension as i64 - 1;
        let begin_x = (focus.x as i64 - reach).max(0);
        let begin_y = (focus.y as i64 - reach).max(0);
        let end_x = (focus.x as i64 + reach).min(max);
        let end_y = (focus.y as i64 + reach).min(max);

        for y in begin_y..=end_y {
            for x in begin_x..=end_x {
                let coord = ChunkCoord::new(x as i32, y as i32);
                if let Some(idx) = self.index(coord) {
                    self.chunks[idx].loaded = true;
                    if !was_loaded[idx] {
                        newly_loaded.push(coord);
                    }
                }
            }
        }

        debug!(%focus, radius, newly_loaded = newly_loaded.len(), "Load window recentered");
        newly_loaded
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.chunks.iter().enumerate().map(move |(i, c)| (self.coord_at(i), c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> + '_ {
        self.chunks.iter_mut()
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.iter().filter(|(_, c)| c.loaded)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.loaded).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = hecs::World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    #[test]
    fn test_flush_removes_before_adds() {
        let e = entities(1)[0];
        let mut chunk = Chunk::default();
        chunk.enqueue_add(e);
        chunk.flush(|_| false);
        assert!(chunk.contains(e));

        // Remove then add within one frame: present exactly once
        chunk.enqueue_remove(e);
        chunk.enqueue_add(e);
        chunk.flush(|_| false);
        assert_eq!(chunk.entities(), &[e]);
    }

    #[test]
    fn test_remove_cancels_unflushed_add() {
        let e = entities(1)[0];
        let mut chunk = Chunk::default();
        chunk.enqueue_add(e);
        chunk.enqueue_remove(e);
        let stats = chunk.flush(|_| false);
        assert_eq!(stats, ChunkFlush { removed: 0, added: 0 });
        assert!(chunk.entities().is_empty());
    }

    #[test]
    fn test_flush_tolerates_absent_removal_and_duplicate_add() {
        let es = entities(2);
        let mut chunk = Chunk::default();
        chunk.enqueue_remove(es[0]);
        chunk.enqueue_add(es[1]);
        chunk.enqueue_add(es[1]);
        let stats = chunk.flush(|_| false);
        assert_eq!(stats, ChunkFlush { removed: 0, added: 1 });
        assert_eq!(chunk.entities(), &[es[1]]);
    }

    #[test]
    fn test_flush_skips_doomed_adds() {
        let e = entities(1)[0];
        let mut chunk = Chunk::default();
        chunk.enqueue_add(e);
        chunk.flush(|candidate| candidate == e);
        assert!(!chunk.contains(e));
    }

    #[test]
    fn test_complete_removal_only_applies_pending() {
        let es = entities(2);
        let mut chunk = Chunk::default();
        chunk.enqueue_add(es[0]);
        chunk.enqueue_add(es[1]);
        chunk.flush(|_| false);

        assert!(!chunk.complete_removal(es[0]));
        assert!(chunk.contains(es[0]));

        chunk.enqueue_remove(es[1]);
        assert!(chunk.complete_removal(es[1]));
        assert_eq!(chunk.entities(), &[es[0]]);
        assert!(chunk.pending_removes().is_empty());
    }

    #[test]
    fn test_grid_dimension_is_capped() {
        let too_wide = MAX_GRID_DIMENSION + 1;
        assert!(matches!(
            ChunkGrid::new(too_wide, 1, too_wide as i32),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_grid_size_must_match_world() {
        assert!(ChunkGrid::new(4, 25, 100).is_ok());
        assert!(matches!(
            ChunkGrid::new(4, 25, 99),
            Err(EngineError::ConfigurationMismatch { actual: 100, .. })
        ));
    }

    #[test]
    fn test_out_of_grid_is_not_loaded() {
        let mut grid = ChunkGrid::new(4, 25, 100).unwrap();
        grid.set_loaded_window(ChunkCoord::new(0, 0), 10);
        assert!(grid.is_loaded(ChunkCoord::new(3, 3)));
        assert!(!grid.is_loaded(ChunkCoord::new(-1, 0)));
        assert!(!grid.is_loaded(ChunkCoord::new(0, 4)));
        assert!(matches!(
            grid.chunk(ChunkCoord::new(4, 0)),
            Err(EngineError::InvalidChunkCoordinate { dimension: 4, .. })
        ));
    }

    #[test]
    fn test_load_window_matches_chebyshev_radius() {
        let mut grid = ChunkGrid::new(100, 100, 10_000).unwrap();
        let focus = ChunkCoord::new(1, 1);
        let newly = grid.set_loaded_window(focus, 3);

        assert_eq!(newly.len(), 9);
        for (coord, chunk) in grid.iter() {
            let expected = (coord.x - focus.x).abs().max((coord.y - focus.y).abs()) <= 2;
            assert_eq!(chunk.is_loaded(), expected, "chunk {}", coord);
        }
        // (1,1) with radius 3 reaches 2 chunks out: {0..=3} x {0..=3}
        assert_eq!(grid.loaded_count(), 16);
    }

    #[test]
    fn test_load_window_clamps_far_edge() {
        let mut grid = ChunkGrid::new(10, 10, 100).unwrap();
        grid.set_loaded_window(ChunkCoord::new(9, 9), 2);
        let loaded: Vec<ChunkCoord> = grid.loaded_chunks().map(|(c, _)| c).collect();
        assert_eq!(loaded.len(), 4);
        assert!(grid.is_loaded(ChunkCoord::new(8, 8)));
        assert!(grid.is_loaded(ChunkCoord::new(9, 9)));
        assert!(!grid.is_loaded(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn test_recenter_reports_only_transitions() {
        let mut grid = ChunkGrid::new(10, 10, 100).unwrap();
        grid.set_loaded_window(ChunkCoord::new(2, 2), 2);
        let newly = grid.set_loaded_window(ChunkCoord::new(3, 2), 2);
        // Column x=4 is new, x=2..=3 stayed loaded
        assert_eq!(newly.len(), 3);
        assert!(newly.iter().all(|c| c.x == 4));
        assert!(!grid.is_loaded(ChunkCoord::new(1, 2)));
    }

    #[test]
    fn test_zero_radius_unloads_everything() {
        let mut grid = ChunkGrid::new(4, 25, 100).unwrap();
        grid.set_loaded_window(ChunkCoord::new(1, 1), 2);
        assert!(grid.set_loaded_window(ChunkCoord::new(1, 1), 0).is_empty());
        assert_eq!(grid.loaded_count(), 0);
    }
}
