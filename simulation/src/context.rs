//! Simulation context - RNG and clocks threaded through the world
//!
//! No global random state: every random draw goes through `SimContext::rng`,
//! so a seed reproduces a session.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct SimContext {
    pub rng: StdRng,
    /// Frames completed
    pub frame: u64,
    /// Simulated milliseconds across all frames
    pub elapsed_ms: u64,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            elapsed_ms: 0,
        }
    }

    pub fn advance(&mut self, delta_ms: u32) {
        self.frame += 1;
        self.elapsed_ms += delta_ms as u64;
    }
}
