//! Engine configuration
//!
//! Fixed at world construction. `grid_dimension * chunk_size == world_size`
//! is checked before any chunk is allocated.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::chunk::MAX_GRID_DIMENSION;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunks per axis
    pub grid_dimension: u32,

    /// World units per chunk edge
    pub chunk_size: i32,

    /// World units per axis; must equal `grid_dimension * chunk_size`
    pub world_size: i32,

    /// Load window radius in chunks (window side is `2 * radius - 1`)
    pub chunk_load_radius: u32,

    /// Number of valid sprite levels; out-of-range levels fall back to this value
    pub sprite_level_count: u8,

    /// Milliseconds between frames when driven by the frame runner
    pub frame_interval_ms: u64,

    /// Minimum milliseconds between two thrust impulses of a piloted entity
    pub player_move_interval_ms: u32,

    /// Speed cap for piloted/inertial entities, in world units per frame
    pub max_speed: f32,

    /// Seed for the simulation RNG
    pub rng_seed: u64,

    /// Candidate count above which the collision sweep runs on the rayon pool
    pub parallel_scan_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_dimension: 100,
            chunk_size: 100,
            world_size: 100 * 100,
            chunk_load_radius: 3,
            sprite_level_count: 10,
            frame_interval_ms: 40,
            player_move_interval_ms: 0,
            max_speed: 8.0,
            rng_seed: 0x5eed,
            parallel_scan_threshold: 512,
        }
    }
}

impl EngineConfig {
    /// Small world for tests and demos: `dimension` chunks of `chunk_size` units.
    pub fn with_grid(grid_dimension: u32, chunk_size: i32) -> Self {
        Self {
            grid_dimension,
            chunk_size,
            world_size: grid_dimension as i32 * chunk_size,
            ..Default::default()
        }
    }

    /// Fail fast on a grid that does not map onto the world.
    pub fn validate(&self) -> Result<()> {
        if self.grid_dimension == 0 {
            return Err(EngineError::InvalidConfig("grid_dimension must be positive".into()));
        }
        if self.grid_dimension > MAX_GRID_DIMENSION {
            return Err(EngineError::InvalidConfig(format!(
                "grid_dimension {} exceeds {}",
                self.grid_dimension, MAX_GRID_DIMENSION
            )));
        }
        if self.chunk_size <= 0 {
            return Err(EngineError::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.max_speed.is_nan() || self.max_speed < 0.0 {
            return Err(EngineError::InvalidConfig("max_speed must be non-negative".into()));
        }

        let actual = self.grid_dimension as i64 * self.chunk_size as i64;
        if actual != self.world_size as i64 {
            return Err(EngineError::ConfigurationMismatch {
                grid_dimension: self.grid_dimension,
                chunk_size: self.chunk_size,
                world_size: self.world_size,
                actual,
            });
        }
        Ok(())
    }

    /// Load and validate a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world_size, 10_000);
    }

    #[test]
    fn test_mismatch_is_fatal() {
        let config = EngineConfig {
            world_size: 9_999,
            ..Default::default()
        };
        match config.validate() {
            Err(EngineError::ConfigurationMismatch { actual, .. }) => assert_eq!(actual, 10_000),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = EngineConfig {
            chunk_size: 0,
            world_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        std::fs::write(
            &path,
            r#"{ "grid_dimension": 1000000, "chunk_size": 1, "world_size": 1000000 }"#,
        )
        .unwrap();

        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "grid_dimension": 4, "chunk_size": 25, "world_size": 100 }"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.grid_dimension, 4);
        assert_eq!(config.chunk_load_radius, 3);
    }
}
