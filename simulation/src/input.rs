//! Input snapshot handed to the world once per frame
//!
//! Device polling lives outside the core; this is the sampled state.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2f;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// W
    pub up: bool,
    /// S
    pub down: bool,
    /// A
    pub left: bool,
    /// D
    pub right: bool,
}

impl InputSnapshot {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Thrust direction. Diagonals win over single keys; `up` is +y.
    pub fn direction(&self) -> Option<Vec2f> {
        let dir = match (self.up, self.down, self.left, self.right) {
            (true, _, _, true) => (1.0, 1.0),
            (true, _, true, _) => (-1.0, 1.0),
            (_, true, _, true) => (1.0, -1.0),
            (_, true, true, _) => (-1.0, -1.0),
            (true, _, _, _) => (0.0, 1.0),
            (_, _, true, _) => (-1.0, 0.0),
            (_, true, _, _) => (0.0, -1.0),
            (_, _, _, true) => (1.0, 0.0),
            _ => return None,
        };
        Some(Vec2f::new(dir.0, dir.1))
    }
}
