//! Chunkworld Simulation Engine
//!
//! Spatial simulation core for a tile/grid world split into chunks: deferred
//! entity membership, AABB collision, and chunk streaming around a focus
//! entity. Rendering, input devices and asset loading stay outside.

pub mod chunk;
pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod frame_runner;
pub mod geometry;
pub mod input;
pub mod persistence;
pub mod prefabs;
pub mod systems;
pub mod world;

pub use chunk::{Chunk, ChunkCoord, ChunkGrid};
pub use components::*;
pub use config::EngineConfig;
pub use error::{EngineError, MoveError, Result};
pub use geometry::{Aabb, Vec2f, Vec2i};
pub use input::InputSnapshot;
pub use persistence::{ImportResult, SaveStats, SavedEntity, Snapshot};
pub use world::{FlushStats, FrameReport, SimulationWorld, WorldEvent};
