//! Error types for the simulation core

use thiserror::Error;

use crate::chunk::ChunkCoord;
use crate::geometry::Vec2i;

/// Engine errors: startup, lookup and persistence failures
#[derive(Debug, Error)]
pub enum EngineError {
    /// Grid dimension and chunk size do not span the declared world size
    #[error(
        "configuration mismatch: {grid_dimension} chunks x {chunk_size} units = {actual}, \
         but world size is {world_size}"
    )]
    ConfigurationMismatch {
        grid_dimension: u32,
        chunk_size: i32,
        world_size: i32,
        actual: i64,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Chunk lookup outside the grid
    #[error("chunk coordinate {coord} is outside the {dimension}x{dimension} grid")]
    InvalidChunkCoordinate { coord: ChunkCoord, dimension: u32 },

    /// Position that maps to no chunk
    #[error("position {0:?} is outside the world")]
    PositionOutsideWorld(Vec2i),

    #[error("entity {0:?} does not exist")]
    NoSuchEntity(hecs::Entity),

    #[error("unsupported snapshot version: {0}")]
    UnsupportedSnapshotVersion(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a move was refused. The entity's position is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("move by {delta:?} from {position:?} leaves the world")]
    OutOfBounds { position: Vec2i, delta: Vec2i },

    #[error("move would overlap {hits} collidable entities")]
    CollisionRejected { hits: usize },

    #[error("entity {0:?} does not exist")]
    NoSuchEntity(hecs::Entity),
}
