//! Persistence module for export/import of simulation state
//!
//! A snapshot lists every entity with the chunk it last occupied. Loading
//! re-attaches each one through `SimulationWorld::attach_entity`, so restored
//! entities go through the same deferred path as freshly spawned ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::chunk::ChunkCoord;
use crate::components::*;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::geometry::Vec2i;
use crate::world::SimulationWorld;

pub const SNAPSHOT_VERSION: u8 = 1;

// ============================================================================
// Export Data Structures
// ============================================================================

/// Complete world state for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u8,
    pub saved_at: DateTime<Utc>,
    pub frame: u64,
    pub elapsed_ms: u64,
    pub config: EngineConfig,
    pub camera: Vec2i,
    pub loaded_chunks: Vec<ChunkCoord>,
    pub entities: Vec<SavedEntity>,
}

/// One entity and the chunk it was attached to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEntity {
    pub chunk: ChunkCoord,
    /// Waiting in the chunk's unloaded-transition buffer
    pub parked: bool,
    pub blueprint: Blueprint,
    pub ms_since_thrust: u32,
}

/// Result of import operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub entities: usize,
    pub parked: usize,
    pub loaded_chunks: usize,
    pub frame: u64,
}

/// Result of a file save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveStats {
    pub entities: usize,
    pub file_bytes: usize,
}

// ============================================================================
// Export / Import
// ============================================================================

impl SimulationWorld {
    /// Capture every entity across all chunks. Order is not meaningful.
    pub fn export_snapshot(&self) -> Snapshot {
        let mut entities = Vec::new();

        let mut query = self.world.query::<(
            &Position,
            &Colliders,
            &Collidable,
            &SpriteLevel,
            &Behavior,
            &Velocity,
            &Residence,
            Option<&Animation>,
            Option<&Thruster>,
        )>();
        for (entity, (pos, colliders, collidable, level, behavior, velocity, residence, animation, thruster)) in
            query.iter()
        {
            if self.pending_despawn.contains(&entity) {
                continue;
            }
            entities.push(SavedEntity {
                chunk: residence.chunk(),
                parked: residence.is_parked(),
                blueprint: Blueprint {
                    position: pos.0,
                    colliders: colliders.0.clone(),
                    collidable: collidable.0,
                    sprite_level: level.get() as i32,
                    behavior: *behavior,
                    velocity: velocity.0,
                    animation: animation.copied(),
                },
                ms_since_thrust: thruster.map(|t| t.ms_since_thrust).unwrap_or(0),
            });
        }

        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            frame: self.ctx.frame,
            elapsed_ms: self.ctx.elapsed_ms,
            config: self.config.clone(),
            camera: self.camera,
            loaded_chunks: self.grid.loaded_chunks().map(|(coord, _)| coord).collect(),
            entities,
        }
    }

    /// Replace the whole world with a snapshot. On error the current world is
    /// left untouched.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> Result<ImportResult> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::UnsupportedSnapshotVersion(snapshot.version));
        }

        let mut fresh = SimulationWorld::new(snapshot.config)?;
        fresh.ctx.frame = snapshot.frame;
        fresh.ctx.elapsed_ms = snapshot.elapsed_ms;
        fresh.camera = snapshot.camera;

        for coord in &snapshot.loaded_chunks {
            fresh.grid.set_loaded(*coord, true)?;
        }

        let mut parked = 0usize;
        for saved in &snapshot.entities {
            let entity = fresh.attach_entity(saved.blueprint.clone(), saved.chunk, saved.parked)?;
            if saved.parked {
                parked += 1;
            }
            if let Ok(mut thruster) = fresh.world.get::<&mut Thruster>(entity) {
                thruster.ms_since_thrust = saved.ms_since_thrust;
            }
        }
        fresh.flush_deferred();
        fresh.drain_events();

        let result = ImportResult {
            entities: snapshot.entities.len(),
            parked,
            loaded_chunks: snapshot.loaded_chunks.len(),
            frame: snapshot.frame,
        };
        *self = fresh;

        info!(
            entities = result.entities,
            parked = result.parked,
            loaded_chunks = result.loaded_chunks,
            "World imported"
        );
        Ok(result)
    }

    /// Export entire world state to a JSON string
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_snapshot())?)
    }

    /// Import world state from a JSON string, replacing current state
    pub fn import_json(&mut self, json: &str) -> Result<ImportResult> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        self.import_snapshot(snapshot)
    }

    /// Write a bincode snapshot to `path`
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<SaveStats> {
        let path = path.as_ref();
        let snapshot = self.export_snapshot();
        let bytes = bincode::serialize(&snapshot)?;
        std::fs::write(path, &bytes)?;

        let stats = SaveStats {
            entities: snapshot.entities.len(),
            file_bytes: bytes.len(),
        };
        info!(path = %path.display(), entities = stats.entities, bytes = stats.file_bytes, "World saved");
        Ok(stats)
    }

    /// Read a bincode snapshot from `path`, replacing current state
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<ImportResult> {
        let bytes = std::fs::read(path.as_ref())?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;
        self.import_snapshot(snapshot)
    }
}
